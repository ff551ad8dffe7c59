use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mischt::{Frame, FrameShape, GraphSpec, Pull, FRAME_LEN};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("mix two matched streams", |b| {
        let shape = FrameShape::s16(44100, 2, FRAME_LEN);
        let mut graph = GraphSpec::mix(&[shape, shape], &[5.0, 15.0], 3, shape)
            .build()
            .unwrap();
        let a = Frame::from_samples(shape, vec![1000; shape.samples_per_frame()]);
        let b_frame = Frame::from_samples(shape, vec![-500; shape.samples_per_frame()]);

        b.iter(move || {
            graph.push(0, a.clone()).unwrap();
            graph.push(1, b_frame.clone()).unwrap();
            while let Pull::Frame(frame) = graph.pull() {
                black_box(frame);
            }
        })
    });

    c.bench_function("mix with resample and upmix", |b| {
        let out = FrameShape::s16(48000, 2, FRAME_LEN);
        let voice = FrameShape::s16(22050, 1, FRAME_LEN);
        let mut graph = GraphSpec::mix(&[out, voice], &[5.0, 15.0], 3, out)
            .build()
            .unwrap();
        let a = Frame::from_samples(out, vec![1000; out.samples_per_frame()]);
        let v = Frame::from_samples(voice, vec![-500; voice.samples_per_frame()]);

        b.iter(move || {
            graph.push(0, a.clone()).unwrap();
            graph.push(1, v.clone()).unwrap();
            while let Pull::Frame(frame) = graph.pull() {
                black_box(frame);
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
