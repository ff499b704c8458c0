use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use esframe::player::Player;
use esframe::process::AudioType;
use esframe::structs::mp3::Mp3Header;

const RING_CAPACITY: usize = 256 * 1024;

pub fn cmd_info(args: &InfoArgs, _cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing elementary stream: {}", args.input.display());

    let reader = InputReader::new(&args.input)?;
    let mut player = Player::new(RING_CAPACITY, reader);

    let audio_type = player.audio_type();
    if audio_type == AudioType::Unknown {
        bail!("unrecognized stream format (raw PCM and ADIF are not supported)");
    }

    player.init(audio_type)?;

    let first_offset = player.position();
    let first_header = player
        .fixed_header()
        .map(Mp3Header::parse)
        .and_then(Result::ok);

    println!();
    println!("Stream Information");
    println!("  Format                    {audio_type}");
    println!("  First frame offset        {first_offset}");
    if let Some(header) = &first_header {
        println!("  MPEG version              {}", header.version);
        println!("  Layer                     {}", header.layer);
        println!("  Sampling rate             {} Hz", header.sample_rate_hz);
        println!("  First frame bitrate       {} kbps", header.bitrate_kbps);
        println!("  First frame size          {} bytes", header.frame_size);
    }
    println!();

    let pb = if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Scanning frames...");
        Some(pb)
    } else {
        None
    };

    let mut frames: u64 = 0;
    let mut frame_bytes: u64 = 0;
    while let Some(frame) = player.next_frame() {
        frames += 1;
        frame_bytes += frame.len() as u64;

        if frames % 100 == 0 {
            if let Some(pb) = &pb {
                pb.set_message(format!("Scanning frames...       {frames}"));
            }
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    println!("Analysis Summary");
    println!("  Frames                    {frames}");
    println!("  Frame bytes               {frame_bytes}");
    if let Some(header) = &first_header {
        let duration_secs =
            frames as f64 * f64::from(header.samples_per_frame()) / f64::from(header.sample_rate_hz);
        println!("  Duration                  {duration_secs:.1} s");
        if duration_secs > 0.0 {
            let avg_kbps = frame_bytes as f64 * 8.0 / (duration_secs * 1000.0);
            println!("  Average bitrate           {avg_kbps:.1} kbps");
        }
    }
    println!();

    Ok(())
}
