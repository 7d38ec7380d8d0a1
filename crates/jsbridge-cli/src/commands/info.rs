//! `jsbridge info`: Display engine information.

use jsbridge_script::ScriptEngineFactory;

pub fn execute() -> anyhow::Result<()> {
    let factory = ScriptEngineFactory::new();
    println!("jsbridge v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Engine:       {} {}", factory.engine_name(), factory.engine_version());
    println!("Language:     {} {}", factory.language_name(), factory.language_version());
    println!("Names:        {}", factory.names().join(", "));
    println!("Extensions:   {}", factory.extensions().join(", "));
    println!("MIME types:   {}", factory.mime_types().join(", "));
    println!("Platform:     {} ({})", std::env::consts::OS, std::env::consts::ARCH);

    println!();
    println!("Environment:");
    print_env("  RUST_LOG", "RUST_LOG");
    print_env("  NO_COLOR", "NO_COLOR");
    Ok(())
}

fn print_env(label: &str, var: &str) {
    match std::env::var(var) {
        Ok(val) => println!("{} = {}", label, val),
        Err(_) => println!("{} = (default)", label),
    }
}
