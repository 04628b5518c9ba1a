//! Benchmark: resource creation, registry sweep and manager teardown on the host driver.

use std::sync::Arc;
use std::time::Instant;

use vkore::prelude::*;
use vkore_driver::HostDriver;

fn bench_create(count: usize) -> (f64, Manager, Vec<Tensor>) {
    let mut mgr = Manager::with_driver(Arc::new(HostDriver::default())).unwrap();
    let data = vec![1.0f32; 256];
    let start = Instant::now();
    let tensors: Vec<Tensor> = (0..count)
        .map(|_| mgr.tensor(&data, TensorType::Device).unwrap())
        .collect();
    let secs = start.elapsed().as_secs_f64();
    (secs, mgr, tensors)
}

fn main() {
    println!("=== vkore Registry Benchmark ===\n");
    println!("{:<10} {:>14} {:>14} {:>14} {:>10}",
        "Count", "Create (us)", "Sweep (ms)", "Destroy (ms)", "Swept");
    println!("{}", "-".repeat(66));

    for &count in &[100usize, 1_000, 10_000, 50_000] {
        let (create_s, mut mgr, mut tensors) = bench_create(count);

        // Drop every other tensor so the sweep has real work.
        let mut i = 0;
        tensors.retain(|_| {
            i += 1;
            i % 2 == 0
        });

        let start = Instant::now();
        let swept = mgr.clear();
        let sweep_s = start.elapsed().as_secs_f64();

        let start = Instant::now();
        mgr.destroy();
        let destroy_s = start.elapsed().as_secs_f64();
        drop(tensors);

        println!("{:<10} {:>12.3}us {:>12.3}ms {:>12.3}ms {:>10}",
            count,
            create_s * 1e6 / count as f64,
            sweep_s * 1000.0,
            destroy_s * 1000.0,
            swept,
        );
    }
}
