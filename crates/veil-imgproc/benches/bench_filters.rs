use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use veil_image::Image;
use veil_imgproc::filter::{box_blur_with_strategy, gaussian_blur, pixelate, BoxBlurStrategy};
use veil_imgproc::parallel::ExecutionStrategy;

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("Obscure Filters");

    for (width, height) in [(640, 480), (1920, 1080)].iter() {
        for radius in [1, 5, 15].iter() {
            group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

            let parameter_string = format!("{}x{}x{}", width, height, radius);

            // input image
            let image_data = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
            let image_size = [*width, *height].into();
            let image = Image::<u8, 3>::new(image_size, image_data).unwrap();

            // output image
            let output = Image::<u8, 3>::from_size_val(image_size, 0).unwrap();

            // the direct convolution is quadratic in the radius
            if *radius <= 5 {
                group.bench_with_input(
                    BenchmarkId::new("gaussian_blur", &parameter_string),
                    &(&image, &output),
                    |b, i| {
                        let (src, mut dst) = (i.0, i.1.clone());
                        b.iter(|| black_box(gaussian_blur(src, &mut dst, *radius, 2.0)))
                    },
                );
            }

            for (name, blur_strategy) in [
                ("box_blur_transpose", BoxBlurStrategy::Transpose),
                ("box_blur_vertical", BoxBlurStrategy::Vertical),
            ] {
                group.bench_with_input(
                    BenchmarkId::new(name, &parameter_string),
                    &(&image, &output),
                    |b, i| {
                        let (src, mut dst) = (i.0, i.1.clone());
                        b.iter(|| {
                            black_box(box_blur_with_strategy(
                                src,
                                &mut dst,
                                *radius,
                                3,
                                blur_strategy,
                                ExecutionStrategy::Auto,
                            ))
                        })
                    },
                );
            }

            group.bench_with_input(
                BenchmarkId::new("pixelate", &parameter_string),
                &(&image, &output),
                |b, i| {
                    let (src, mut dst) = (i.0, i.1.clone());
                    b.iter(|| black_box(pixelate(src, &mut dst, *radius)))
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_filters);
criterion_main!(benches);
