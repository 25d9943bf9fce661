use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dasp_signal::{self as signal, Signal};
use funke::nodes::{Constant, Samples};
use funke::{Renderer, SoundStream, Value};

const RATE: f64 = 48000.0;

fn sine_control(hz: f64, len: usize) -> Vec<f32> {
    signal::rate(RATE)
        .const_hz(hz)
        .sine()
        .take(len)
        .map(|s| s as f32)
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let control = sine_control(480.0, 4800);

    c.bench_function("Trigger render, 48 edges", |b| {
        b.iter(|| {
            let input = SoundStream::new(Samples::new(control.clone()), RATE, 0.0).unwrap();
            let out = input.trigger(|now| {
                let click = Constant::new(0.5).with_len(32);
                Value::Sound(SoundStream::new(click, RATE, now).unwrap())
            });
            black_box(Renderer::new(out).render(usize::MAX).unwrap())
        })
    });

    c.bench_function("Samples render", |b| {
        b.iter(|| {
            let input = SoundStream::new(Samples::new(control.clone()), RATE, 0.0).unwrap();
            black_box(Renderer::new(input).render(usize::MAX).unwrap())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
