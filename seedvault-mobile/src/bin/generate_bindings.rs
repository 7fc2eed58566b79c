//! Generates UniFFI bindings from the compiled seedvault-mobile library.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use uniffi_bindgen::bindings::{
    KotlinBindingGenerator, PythonBindingGenerator, SwiftBindingGenerator,
};
use uniffi_bindgen::library_mode::generate_bindings;
use uniffi_bindgen::EmptyCrateConfigSupplier;

#[derive(Parser)]
#[command(name = "generate-bindings")]
#[command(about = "Generate UniFFI bindings for seedvault-mobile")]
struct Cli {
    /// Path to the compiled library (.so, .dylib, or .a file)
    #[arg(long, default_value = "target/release/libseedvault_mobile.so")]
    library: Utf8PathBuf,

    /// Output language
    #[arg(short = 'l', long = "language", default_value = "kotlin")]
    language: Language,

    /// Output directory
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<Utf8PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Language {
    Swift,
    Kotlin,
    Python,
}

impl Language {
    fn name(self) -> &'static str {
        match self {
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Python => "python",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let out_dir = cli
        .out_dir
        .unwrap_or_else(|| Utf8PathBuf::from(format!("{}/generated", cli.language.name())));

    if !cli.library.exists() {
        anyhow::bail!("Library not found: {}", cli.library);
    }
    std::fs::create_dir_all(&out_dir)?;

    println!("Generating {} bindings...", cli.language.name());
    println!("Library: {}", cli.library);
    println!("Output: {}", out_dir);

    match cli.language {
        Language::Swift => {
            generate_bindings(
                &cli.library,
                None,
                &SwiftBindingGenerator,
                &EmptyCrateConfigSupplier,
                None,
                &out_dir,
                false,
            )?;
        }
        Language::Kotlin => {
            generate_bindings(
                &cli.library,
                None,
                &KotlinBindingGenerator,
                &EmptyCrateConfigSupplier,
                None,
                &out_dir,
                false,
            )?;
        }
        Language::Python => {
            generate_bindings(
                &cli.library,
                None,
                &PythonBindingGenerator,
                &EmptyCrateConfigSupplier,
                None,
                &out_dir,
                false,
            )?;
        }
    }

    println!("Bindings written to {}", out_dir);
    Ok(())
}
