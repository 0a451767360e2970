use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};

use cc0c::config::{CompilerConfig, EmitMode};

/// Compiler for c0, a teaching language, targeting the o0 stack VM.
#[derive(Parser, Debug)]
#[command(name = "cc0", version, about)]
#[command(group(ArgGroup::new("mode").args(["text", "binary"]).required(true)))]
struct Cli {
    /// Source file to compile, or `-` for stdin.
    input: PathBuf,

    /// Output path, or `-` for stdout.
    #[arg(short, long)]
    output: PathBuf,

    /// Emit the textual assembly listing.
    #[arg(short = 's', long)]
    text: bool,

    /// Emit the binary object file.
    #[arg(short = 'c', long = "binary")]
    binary: bool,
}

enum ReadError {
    Io(io::Error),
    NotUtf8,
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "{e}"),
            ReadError::NotUtf8 => write!(f, "input is not valid UTF-8"),
        }
    }
}

fn read_input(path: &PathBuf) -> Result<String, ReadError> {
    let bytes = if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).map_err(ReadError::Io)?;
        buf
    } else {
        fs::read(path).map_err(ReadError::Io)?
    };
    String::from_utf8(bytes).map_err(|_| ReadError::NotUtf8)
}

fn write_output(
    path: &PathBuf,
    body: impl FnOnce(&mut dyn Write) -> io::Result<cc0c::error::Result<()>>,
) -> io::Result<cc0c::error::Result<()>> {
    if path.as_os_str() == "-" {
        let mut stdout = io::stdout();
        body(&mut stdout)
    } else {
        let mut file = fs::File::create(path)?;
        body(&mut file)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let emit_mode = if cli.binary { EmitMode::Binary } else { EmitMode::Text };

    let source = match read_input(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error reading {}: {e}", cli.input.display());
            return ExitCode::from(2);
        }
    };

    let config = CompilerConfig::new(emit_mode);
    let write_res = write_output(&cli.output, |w| cc0c::compile_source_with_config(&source, w, &config));

    match write_res {
        Ok(Ok(())) => ExitCode::from(0),
        Ok(Err(e)) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error writing {}: {}", cli.output.display(), e);
            ExitCode::from(2)
        }
    }
}
