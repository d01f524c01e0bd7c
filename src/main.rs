use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use blockcast::{
    load_image, save_image, CodecResult, EncoderConfig, FrameDecoder, FrameEncoder,
};

#[derive(Parser)]
#[command(name = "blockcast", version, about = "Packetized intra-frame macroblock codec")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode an image into a packetized bitstream file
    Encode {
        /// Input image (PNG or JPEG)
        input: PathBuf,
        /// Output bitstream path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Macroblock size; must divide both image dimensions
        #[arg(short = 'm', long = "mbsize", default_value_t = 16)]
        macroblock_size: usize,
        /// Print debugging logs
        #[arg(short, long)]
        debug: bool,
    },
    /// Decode a packetized bitstream file back into an image
    Decode {
        /// Input bitstream file
        input: PathBuf,
        /// Output image path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Expected macroblock size (the stream header takes precedence)
        #[arg(short = 'm', long = "mbsize", default_value_t = 16)]
        macroblock_size: usize,
        /// Print debugging logs
        #[arg(short, long)]
        debug: bool,
    },
    /// Stream frames over TCP: run a receiving server or a sending client
    Network {
        /// Listen for incoming frames instead of sending
        #[arg(short, long)]
        listen: bool,
        /// Server address
        #[arg(short = 'a', long = "addr", default_value = "127.0.0.1")]
        addr: String,
        /// Server port
        #[arg(short, long, default_value_t = 12345)]
        port: u16,
        /// Print debugging logs
        #[arg(short, long)]
        debug: bool,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Encode {
            input,
            output,
            macroblock_size,
            debug,
        } => {
            init_logging(debug);
            let output = output.unwrap_or_else(|| input.with_extension("bcf"));
            encode_file(&input, &output, macroblock_size)
        }
        Command::Decode {
            input,
            output,
            macroblock_size: _,
            debug,
        } => {
            init_logging(debug);
            let output = output.unwrap_or_else(|| input.with_extension("png"));
            decode_file(&input, &output)
        }
        Command::Network {
            listen,
            addr,
            port,
            debug,
        } => {
            init_logging(debug);
            if listen {
                run_server(&addr, port)
            } else {
                run_client(&addr, port)
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn encode_file(input: &Path, output: &Path, macroblock_size: usize) -> CodecResult<()> {
    println!(
        "{} {} → {} (macroblock size: {})",
        "Encoding".cyan().bold(),
        input.display().to_string().yellow(),
        output.display().to_string().green(),
        macroblock_size.to_string().magenta()
    );

    let img = load_image(input)?;
    let encoder =
        FrameEncoder::with_config(EncoderConfig::default().with_macroblock_size(macroblock_size));
    let bytes = encoder.encode_to_vec(&img, 0)?;
    std::fs::write(output, &bytes)?;

    let raw_size = img.width() * img.height() * img.channels();
    let ratio = bytes.len() as f64 / raw_size as f64 * 100.0;
    println!("{}", "✓ Encoded successfully!".green().bold());
    println!("  {} {} bytes", "Raw:   ".dimmed(), raw_size.to_string().white());
    println!("  {} {} bytes", "Output:".dimmed(), bytes.len().to_string().white());
    println!("  {} {}%", "Ratio: ".dimmed(), format!("{:.1}", ratio).cyan());

    Ok(())
}

fn decode_file(input: &Path, output: &Path) -> CodecResult<()> {
    println!(
        "{} {} → {}",
        "Decoding".cyan().bold(),
        input.display().to_string().yellow(),
        output.display().to_string().green()
    );

    let bytes = std::fs::read(input)?;
    let img = FrameDecoder::new().decode(&bytes)?;
    save_image(&img, output)?;

    println!("{}", "✓ Decoded successfully!".green().bold());
    println!(
        "  {} {}x{}",
        "Dimensions:".dimmed(),
        img.width().to_string().white(),
        img.height().to_string().white()
    );

    Ok(())
}

fn run_server(addr: &str, port: u16) -> CodecResult<()> {
    println!(
        "{} {}:{}",
        "Listening on".cyan().bold(),
        addr.yellow(),
        port.to_string().yellow()
    );

    let receiver = blockcast::net::PacketReceiver::bind(addr, port)?;
    receiver.serve(|assembly| {
        let frame_id = assembly.frame_id;
        let img = blockcast::decode_frame(&assembly)?;
        let path = format!("frame_{}.png", frame_id);
        save_image(&img, &path)?;
        println!(
            "{} frame {} ({}x{}) → {}",
            "Received".green().bold(),
            frame_id,
            img.width(),
            img.height(),
            path.white()
        );
        Ok(())
    })
}

/// Sends one encoded test-pattern frame, exercising the full
/// encode-and-transport path against a listening peer.
fn run_client(addr: &str, port: u16) -> CodecResult<()> {
    println!(
        "{} {}:{}",
        "Connecting to".cyan().bold(),
        addr.yellow(),
        port.to_string().yellow()
    );

    let mut img = blockcast::Image::new(64, 64, 3);
    for i in 0..64 {
        for j in 0..64 {
            let on = (i / 8 + j / 8) % 2 == 0;
            img.set_pixel(
                i,
                j,
                if on {
                    blockcast::Pixel::rgb(235, 235, 235)
                } else {
                    blockcast::Pixel::rgb(25, 25, 25)
                },
            );
        }
    }

    let stream = FrameEncoder::new().encode(&img, 0)?;
    let mut sender = blockcast::net::PacketSender::connect(addr, port)?;
    sender.send_bitstream(&stream)?;

    println!(
        "{} {} packets",
        "✓ Sent test frame:".green().bold(),
        stream.packets().len().to_string().white()
    );

    Ok(())
}
