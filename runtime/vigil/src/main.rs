//! Vigil CLI
//!
//! Runs bundled sample programs under a monitoring tool and prints what the
//! tool is told.

use vigil::commands::{parse_trace_options, print_events, print_samples, trace};

fn main() {
    vigil::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "trace" => {
            if args.len() < 3 {
                eprintln!("Usage: vigil trace <sample> [options]");
                eprintln!();
                eprintln!("Run `vigil samples` to list the samples.");
                std::process::exit(1);
            }

            let options = match parse_trace_options(&args[3..]) {
                Ok(options) => options,
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            };

            match trace(&args[2], &options) {
                Ok(report) => {
                    for line in &report.lines {
                        println!("{line}");
                    }
                    for (run, outcome) in report.outcomes.iter().enumerate() {
                        match outcome {
                            Ok(value) => println!("run {run}: returned {value:?}"),
                            Err(exception) => println!("run {run}: raised {exception}"),
                        }
                    }
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            }
        }
        "samples" => {
            print_samples();
        }
        "events" => {
            print_events();
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("Vigil {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Vigil - multi-tool execution monitoring");
    println!();
    println!("Usage: vigil <command> [options]");
    println!();
    println!("Commands:");
    println!("  trace <sample>       Run a sample under a tool and print each event");
    println!("  samples              List the bundled sample programs");
    println!("  events               List event kinds with their bits and payload shapes");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Trace options:");
    println!("  --events=<list>      Comma-separated event names, or `all`");
    println!("                       (default: everything but INSTRUCTION)");
    println!("  --tool=<id>          Tool slot 0-5 or debugger, coverage, profiler, optimizer");
    println!("  --local              Arm the sample's own code only");
    println!("  --disable            Disable each event location after its first report");
    println!("  --repeat=<n>         Run the sample n times");
    println!("  --restart            Re-enable disabled locations between runs");
    println!("  --max-depth=<n>      Maximum interpreted call depth (default: 1000)");
    println!();
    println!("Examples:");
    println!("  vigil trace floop --events=line");
    println!("  vigil trace mixed --events=call --tool=profiler");
    println!("  vigil trace floop --events=line --disable --repeat=2 --restart");
    println!("  RUST_LOG=vigil_monitor=debug vigil trace g1");
}
