use embed_manifest::{
    manifest::{ActiveCodePage, SupportedOS::{Windows7, Windows10}, Setting},
    embed_manifest, new_manifest,
};

fn main() {
    if std::env::var_os("CARGO_CFG_WINDOWS").is_some() {
        embed_manifest(new_manifest("cpucaps.exe.manifest")
            // Remove defaults we don't care about
            .remove_dependency("Microsoft.Windows.Common-Controls")
            .remove_max_version_tested()
            // Set what we care about
            .active_code_page(ActiveCodePage::Utf8)
            .supported_os(Windows7..=Windows10) // Also includes Windows 11
            .long_path_aware(Setting::Enabled)
        )
        .expect("unable to embed manifest file");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
