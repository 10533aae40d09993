// reproject.rs — 逆投影：把当前视角"展开"为新的等距柱状图
//
// Each output pixel is a world-frame lat/lon; the inverse rotation finds the
// texture-frame lat/lon it came from. Rows are independent and run on rayon.

use crate::config::GridResolution;
use crate::equirect::{EquirectangularImage, Rgb};
use crate::error::{GlobeError, Result};
use crate::orientation::OrientationState;
use crate::rotation::SphericalRotation;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReprojectOptions {
    pub reference: GridResolution,
}

impl Default for ReprojectOptions {
    fn default() -> Self {
        Self {
            reference: GridResolution::new(200, 200),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub fn reproject(
    source: &EquirectangularImage,
    orientation: &OrientationState,
    out_width: u32,
    out_height: u32,
    options: ReprojectOptions,
) -> Result<EquirectangularImage> {
    reproject_cancellable(
        source,
        orientation,
        out_width,
        out_height,
        options,
        &CancelToken::default(),
    )
}

pub fn reproject_cancellable(
    source: &EquirectangularImage,
    orientation: &OrientationState,
    out_width: u32,
    out_height: u32,
    options: ReprojectOptions,
    cancel: &CancelToken,
) -> Result<EquirectangularImage> {
    if out_width == 0 || out_height == 0 {
        return Err(GlobeError::Configuration(format!(
            "reprojection output must be non-empty, got {out_width}x{out_height}"
        )));
    }
    options.reference.validate("reprojection reference grid")?;

    let rotation = SphericalRotation::from_orientation(orientation);
    let (w, h) = (out_width as usize, out_height as usize);
    let mut pixels: Vec<Rgb> = vec![[0; 3]; w * h];

    pixels
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(j, row)| {
            if cancel.is_cancelled() {
                return;
            }
            let lat2 = PI * (j as f64 / h as f64 - 0.5);
            for (i, px) in row.iter_mut().enumerate() {
                let lon2 = 2.0 * PI * (i as f64 / w as f64 - 0.5);
                let (lat, lon) = rotation.invert(lat2, lon2);
                *px = source.sample_lat_lon(lat, lon, options.reference);
            }
        });

    if cancel.is_cancelled() {
        return Err(GlobeError::Superseded);
    }
    EquirectangularImage::new(out_width, out_height, pixels)
}

#[derive(Debug)]
pub struct ReprojectionResult {
    pub generation: u64,
    pub orientation: OrientationState,
    pub image: Result<EquirectangularImage>,
}

/// Background reprojection with a supersede-in-flight policy: a new request
/// cancels the running one, and stale results are never handed out.
pub struct ReprojectionJobs {
    generation: Arc<AtomicU64>,
    current: Option<CancelToken>,
    tx: Sender<ReprojectionResult>,
    rx: Receiver<ReprojectionResult>,
}

impl Default for ReprojectionJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl ReprojectionJobs {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            current: None,
            tx,
            rx,
        }
    }

    pub fn request(
        &mut self,
        source: Arc<EquirectangularImage>,
        orientation: OrientationState,
        out_width: u32,
        out_height: u32,
        options: ReprojectOptions,
    ) -> u64 {
        if let Some(prev) = self.current.take() {
            prev.cancel();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancelToken::default();
        self.current = Some(token.clone());

        let tx = self.tx.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let image = reproject_cancellable(
                &source,
                &orientation,
                out_width,
                out_height,
                options,
                &token,
            );
            match &image {
                Ok(_) => log::info!(
                    "reprojection #{generation} finished in {:.1?}",
                    started.elapsed()
                ),
                Err(GlobeError::Superseded) => {
                    log::debug!("reprojection #{generation} superseded")
                }
                Err(e) => log::warn!("reprojection #{generation} failed: {e}"),
            }
            // receiver gone means the app is shutting down
            let _ = tx.send(ReprojectionResult {
                generation,
                orientation,
                image,
            });
        });

        generation
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Latest finished result, if any. Superseded runs are dropped.
    pub fn poll(&mut self) -> Option<ReprojectionResult> {
        let latest = self.generation.load(Ordering::SeqCst);
        let mut found = None;
        while let Ok(res) = self.rx.try_recv() {
            if res.generation == latest && !matches!(res.image, Err(GlobeError::Superseded)) {
                found = Some(res);
            }
        }
        if found.is_some() {
            self.current = None;
        }
        found
    }

    /// Blocks until the latest request finishes.
    pub fn wait(&mut self) -> Option<ReprojectionResult> {
        let latest = self.generation.load(Ordering::SeqCst);
        if self.current.is_none() {
            return None;
        }
        while let Ok(res) = self.rx.recv() {
            if res.generation == latest {
                self.current = None;
                return Some(res);
            }
        }
        None
    }
}
