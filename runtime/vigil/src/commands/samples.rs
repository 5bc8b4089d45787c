use vigil_vm::samples;

/// `vigil samples`
pub fn print_samples() {
    for sample in samples::ALL {
        println!("  {:<24} {}", sample.name, sample.summary);
    }
}
