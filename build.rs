fn main() {
    // Export ESP-IDF link arguments only when cross-compiling the firmware.
    // Host builds (tests, fuzzing) skip this entirely.
    let espidf_feature = std::env::var("CARGO_FEATURE_ESPIDF").is_ok();
    let espidf_target = std::env::var("TARGET").is_ok_and(|t| t.contains("espidf"));
    if espidf_feature && espidf_target {
        embuild::espidf::sysenv::output();
    }
}
