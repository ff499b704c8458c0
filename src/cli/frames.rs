use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::command::{Cli, FramesArgs};
use crate::input::InputReader;
use esframe::player::Player;

const RING_CAPACITY: usize = 256 * 1024;

pub fn cmd_frames(args: &FramesArgs, _cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let reader = InputReader::new(&args.input)?;
    let input_len = reader.len();

    let mut player = Player::new(RING_CAPACITY, reader);
    player.init(args.format.to_audio_type())?;
    log::info!(
        "{} stream, first frame at offset {}",
        player.audio_type(),
        player.position()
    );

    let mut out = match &args.output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    let pb = if let Some(multi) = multi {
        let pb = match input_len {
            Some(len) => {
                let pb = multi.add(ProgressBar::new(len));
                pb.set_style(ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})",
                )?);
                pb
            }
            None => {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    let mut frames: u64 = 0;
    let mut frame_bytes: u64 = 0;

    loop {
        let Some(frame) = player.next_frame() else {
            break;
        };
        let size = frame.len() as u64;
        if let Some(out) = out.as_mut() {
            out.write_all(frame)?;
        }

        frames += 1;
        frame_bytes += size;

        let end = player.position();
        if args.list {
            match &pb {
                Some(pb) => pb.suspend(|| println!("{:>12}  {:>6}", end - size, size)),
                None => println!("{:>12}  {:>6}", end - size, size),
            }
        }
        if let Some(pb) = &pb {
            pb.set_position(end);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    if let Some(mut out) = out {
        out.flush()?;
    }

    println!("{frames} frames, {frame_bytes} payload bytes");
    if let Some(path) = &args.output {
        log::info!("wrote de-framed stream to {}", path.display());
    }

    Ok(())
}
