fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=tracker.local.rs");

    // Secrets stay out of the repository: `tracker.local.rs` (git-ignored)
    // holds `pub const` strings that are exported as LOCAL_* env vars and
    // picked up by `TrackerConfig::default()` through `option_env!`.
    emit_local_secrets();

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

fn emit_local_secrets() {
    let path = std::path::Path::new("tracker.local.rs");
    let Ok(src) = std::fs::read_to_string(path) else {
        return;
    };

    for (name, var) in [
        ("WIFI_SSID", "LOCAL_WIFI_SSID"),
        ("WIFI_PASS", "LOCAL_WIFI_PASS"),
        ("API_KEY", "LOCAL_API_KEY"),
        ("STATION_ID", "LOCAL_STATION_ID"),
        ("DEST_NAME", "LOCAL_DEST_NAME"),
    ] {
        if let Some(v) = extract_rust_str_const(&src, name) {
            println!("cargo:rustc-env={}={}", var, v);
        }
    }
}

fn extract_rust_str_const(src: &str, name: &str) -> Option<String> {
    let needle = format!("pub const {}", name);
    for line in src.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") || !trimmed.starts_with(&needle) {
            continue;
        }
        let start = trimmed.find('"')?;
        let end = trimmed[start + 1..].find('"')? + start + 1;
        return Some(trimmed[start + 1..end].to_string());
    }
    None
}
