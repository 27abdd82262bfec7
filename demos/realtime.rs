use std::{
    thread,
    time::{Duration, Instant},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use mixdeck::{AudioSink, BufferFormat, SampleFormat, Wave};

const DURATION_SECS: u32 = 6;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .expect("no output device available");
    let sample_rate = device.default_output_config().unwrap().sample_rate();
    let config = cpal::StreamConfig {
        channels: 2,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let (ctx, mut mixer) = mixdeck::context()
        .sample_rate(sample_rate.0)
        .channels(2)
        .max_render_frames(8192)
        .build()
        .unwrap();

    // The mixer moves into the callback; `ctx` stays here to control playback.
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / 2;
                mixer.render(data, frames);
            },
            move |err| {
                eprintln!("{}", err);
            },
        )
        .unwrap();
    stream.play().unwrap();

    // A short blip, played on pooled voices so that repeats overlap
    let blip = (0..sample_rate.0 / 10)
        .map(|i| {
            let t = i as f32 / sample_rate.0 as f32;
            (t * 880.0 * 2.0 * std::f32::consts::PI).sin() * 0.3
        })
        .collect::<Vec<_>>();
    let blip = ctx
        .load_sound(&Wave::from_samples(sample_rate.0, 1, &blip))
        .unwrap();

    // A continuous tone fed through a raw stream at a lower rate, in 16-bit samples
    let tone_rate = 22_050;
    let tone = ctx
        .create_stream(BufferFormat::new(SampleFormat::S16, 1, tone_rate))
        .unwrap();
    tone.set_volume(0.5);
    let mut phase = 0u64;
    let mut next_chunk = || {
        (0..tone.sub_buffer_frames())
            .flat_map(|_| {
                let t = phase as f32 / tone_rate as f32;
                phase += 1;
                let x = (t * 220.0 * 2.0 * std::f32::consts::PI).sin() * 0.25;
                ((x * i16::MAX as f32) as i16).to_le_bytes()
            })
            .collect::<Vec<u8>>()
    };

    let start = Instant::now();
    let mut last_blip = start;
    let mut started = false;
    loop {
        thread::sleep(Duration::from_millis(10));
        let dt = start.elapsed();
        if dt >= Duration::from_secs(DURATION_SECS as u64) {
            break;
        }

        while tone.is_processed() {
            let chunk = next_chunk();
            tone.update(&chunk).unwrap();
        }
        if !started {
            tone.play();
            started = true;
        }

        if last_blip.elapsed() >= Duration::from_millis(150) {
            last_blip = Instant::now();
            ctx.play_multi(&blip).unwrap();
        }

        // Sweep the tone upward over the run
        tone.set_pitch(1.0 + dt.as_secs_f32() / DURATION_SECS as f32)
            .unwrap();
    }

    println!(
        "tone underruns: {}, voices still playing: {}",
        tone.buffer().underruns(),
        ctx.playing_multi()
    );
}
