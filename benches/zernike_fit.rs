use aoclc::{zernike::ZernikeBasis, Builder, FromBuilder, MirrorSurface, SurfaceFit, SurfaceMap};
use criterion::*;

fn polar_grid(ri: f64, ro: f64, n_r: usize, n_o: usize) -> (Vec<f64>, Vec<f64>) {
    (0..n_r)
        .flat_map(|i| {
            let r = ri + (ro - ri) * (i as f64 + 0.5) / n_r as f64;
            (0..n_o).map(move |j| {
                let o = 2. * std::f64::consts::PI * j as f64 / n_o as f64;
                (r * o.cos(), r * o.sin())
            })
        })
        .unzip()
}

pub fn zernike_basis(c: &mut Criterion) {
    let (x, y) = polar_grid(0.2, 1., 50, 200);
    c.bench_function("zernike basis 28 terms", |b| {
        b.iter(|| ZernikeBasis::new(28, &x, &y).unwrap())
    });
}

pub fn zernike_fit(c: &mut Criterion) {
    let (x, y) = polar_grid(0.9, 1.71, 50, 200);
    let z: Vec<f64> = x.iter().zip(&y).map(|(x, y)| 1e-6 * (x * x - y * y)).collect();
    let mut m2 = MirrorSurface::builder()
        .annulus(0.9, 1.71)
        .n_term(28)
        .build()
        .unwrap();
    m2.set_surface(SurfaceMap::new(x, y, z).unwrap());
    c.bench_function("M2 surface zernike fit", |b| {
        b.iter(|| m2.zernike_fit().unwrap())
    });
}

criterion_group!(benches, zernike_basis, zernike_fit);
criterion_main!(benches);
