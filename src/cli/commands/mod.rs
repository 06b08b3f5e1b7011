use anyhow::Result;

pub mod config;
pub mod languages;
pub mod run;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

pub async fn show_how_to_get_started() -> Result<()> {
    println!("🎬 Subdub - subtitles and dubbing for any video");
    println!();
    println!("To get started:");
    println!("  🚀 subdub run --email <EMAIL> --video-url <URL> --full-name <NAME> --password <PASSWORD>");
    println!("  🌍 subdub languages   # Supported subtitle and dubbing languages");
    println!("  ⚙️  subdub config      # Show the effective configuration");
    println!();
    println!("💡 Add --offline to try the whole flow with demo data.");
    Ok(())
}
