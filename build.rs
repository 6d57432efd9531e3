use chrono::Utc;

fn main() {
    // Build timestamp for `--version` / 构建时间
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("cargo:rerun-if-changed=build.rs");
}
