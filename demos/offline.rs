use mixdeck::{AudioSink, Limiter, Wave, WaveSource};

const DURATION_SECS: u32 = 3;
const RATE: u32 = 44100;
const FRAME_SIZE: usize = 512;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (ctx, mut mixer) = mixdeck::context()
        .sample_rate(RATE)
        .channels(2)
        .max_render_frames(FRAME_SIZE)
        .limiter(Limiter::Tanh)
        .build()
        .unwrap();

    // One second of a low drone, looped as music for the whole render
    let drone = (0..RATE)
        .map(|i| {
            let t = i as f32 / RATE as f32;
            (t * 110.0 * 2.0 * std::f32::consts::PI).sin() * 0.4
        })
        .collect::<Vec<_>>();
    let mut music = ctx
        .load_music(WaveSource::new(Wave::from_samples(RATE, 1, &drone)))
        .unwrap();
    music.set_loop_count(DURATION_SECS);
    music.play().unwrap();

    let boop = (0..RATE / 4)
        .map(|i| {
            let t = i as f32 / RATE as f32;
            (t * 500.0 * 2.0 * std::f32::consts::PI).sin() * 0.8
        })
        .collect::<Vec<_>>();
    let boop = ctx.load_sound(&Wave::from_samples(RATE, 1, &boop)).unwrap();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create("mixdeck.wav", spec).unwrap();

    let mut block = [0.0; FRAME_SIZE * 2];
    let blocks = (RATE * DURATION_SECS) as usize / FRAME_SIZE;
    for i in 0..blocks {
        // A boop every half second, rising in pitch
        if i % (RATE as usize / 2 / FRAME_SIZE) == 0 {
            boop.set_pitch(1.0 + i as f32 / blocks as f32).unwrap();
            ctx.play_multi(&boop).unwrap();
        }
        music.update().unwrap();
        mixer.render(&mut block, FRAME_SIZE);
        for &sample in &block {
            writer
                .write_sample((sample * i16::MAX as f32) as i16)
                .unwrap();
        }
    }

    writer.finalize().unwrap();
    println!("played {:.2}s of music", music.time_played());
}
