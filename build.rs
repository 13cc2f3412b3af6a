#[cfg(windows)]
fn main() {
    let mut res = winres::WindowsResource::new();
    if std::path::Path::new("assets/icon.ico").exists() {
        res.set_icon("assets/icon.ico");
    }
    res.set("ProductName", "CustomFPS");
    res.set("FileDescription", "CustomFPS - Frame Rate Target Renderer");
    res.set("LegalCopyright", "© 2025 CustomFPS Contributors");
    res.set("CompanyName", "CustomFPS");
    res.set("OriginalFilename", "customfps.exe");

    if let Err(e) = res.compile() {
        eprintln!("Failed to compile Windows resource: {}", e);
    }
}

#[cfg(not(windows))]
fn main() {
}
