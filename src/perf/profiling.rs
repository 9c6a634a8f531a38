/// Instrumentation infrastructure for pipeline analysis
/// Provides per-stage call counting with negligible overhead when disabled
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe performance counters for pipeline stage tracking
pub struct FunctionCounters {
    // Vertex stage counters
    pub mesh_transform_calls: AtomicU64,
    pub vertices_transformed: AtomicU64,

    // Rasterization counters
    pub render_triangle_calls: AtomicU64,
    pub render_triangle_degenerate: AtomicU64,
    pub render_triangle_culled: AtomicU64,
    pub render_triangle_backface: AtomicU64,

    // Pixel counters
    pub set_pixel_attempts: AtomicU64,
    pub set_pixel_depth_passed: AtomicU64,
    pub set_pixel_depth_failed: AtomicU64,

    // Framebuffer counters
    pub framebuffer_clear_calls: AtomicU64,
    pub snapshot_saves: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            mesh_transform_calls: AtomicU64::new(0),
            vertices_transformed: AtomicU64::new(0),
            render_triangle_calls: AtomicU64::new(0),
            render_triangle_degenerate: AtomicU64::new(0),
            render_triangle_culled: AtomicU64::new(0),
            render_triangle_backface: AtomicU64::new(0),
            set_pixel_attempts: AtomicU64::new(0),
            set_pixel_depth_passed: AtomicU64::new(0),
            set_pixel_depth_failed: AtomicU64::new(0),
            framebuffer_clear_calls: AtomicU64::new(0),
            snapshot_saves: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.mesh_transform_calls.store(0, Ordering::Relaxed);
        self.vertices_transformed.store(0, Ordering::Relaxed);
        self.render_triangle_calls.store(0, Ordering::Relaxed);
        self.render_triangle_degenerate.store(0, Ordering::Relaxed);
        self.render_triangle_culled.store(0, Ordering::Relaxed);
        self.render_triangle_backface.store(0, Ordering::Relaxed);
        self.set_pixel_attempts.store(0, Ordering::Relaxed);
        self.set_pixel_depth_passed.store(0, Ordering::Relaxed);
        self.set_pixel_depth_failed.store(0, Ordering::Relaxed);
        self.framebuffer_clear_calls.store(0, Ordering::Relaxed);
        self.snapshot_saves.store(0, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            mesh_transform_calls: self.mesh_transform_calls.load(Ordering::Relaxed),
            vertices_transformed: self.vertices_transformed.load(Ordering::Relaxed),
            render_triangle_calls: self.render_triangle_calls.load(Ordering::Relaxed),
            render_triangle_degenerate: self.render_triangle_degenerate.load(Ordering::Relaxed),
            render_triangle_culled: self.render_triangle_culled.load(Ordering::Relaxed),
            render_triangle_backface: self.render_triangle_backface.load(Ordering::Relaxed),
            set_pixel_attempts: self.set_pixel_attempts.load(Ordering::Relaxed),
            set_pixel_depth_passed: self.set_pixel_depth_passed.load(Ordering::Relaxed),
            set_pixel_depth_failed: self.set_pixel_depth_failed.load(Ordering::Relaxed),
            framebuffer_clear_calls: self.framebuffer_clear_calls.load(Ordering::Relaxed),
            snapshot_saves: self.snapshot_saves.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub mesh_transform_calls: u64,
    pub vertices_transformed: u64,
    pub render_triangle_calls: u64,
    pub render_triangle_degenerate: u64,
    pub render_triangle_culled: u64,
    pub render_triangle_backface: u64,
    pub set_pixel_attempts: u64,
    pub set_pixel_depth_passed: u64,
    pub set_pixel_depth_failed: u64,
    pub framebuffer_clear_calls: u64,
    pub snapshot_saves: u64,
}

impl CounterSnapshot {
    /// Print formatted report
    pub fn print_report(&self) {
        println!("\n=== Performance Counters Report ===");
        println!("\nVertex Stage:");
        println!("  mesh transforms:            {:12}", self.mesh_transform_calls);
        println!("  vertices transformed:       {:12}", self.vertices_transformed);

        println!("\nRasterization Operations:");
        println!("  render_triangle calls:      {:12}", self.render_triangle_calls);
        println!("  triangles degenerate:       {:12}", self.render_triangle_degenerate);
        println!("  triangles culled:           {:12}", self.render_triangle_culled);
        println!("  triangles backfaced:        {:12}", self.render_triangle_backface);

        println!("\nPixel Operations:");
        println!("  set_pixel attempts:         {:12}", self.set_pixel_attempts);
        println!("  depth test passed:          {:12}", self.set_pixel_depth_passed);
        println!("  depth test failed:          {:12}", self.set_pixel_depth_failed);
        if self.set_pixel_attempts > 0 {
            let pass_rate =
                (self.set_pixel_depth_passed as f64 / self.set_pixel_attempts as f64) * 100.0;
            println!("  depth test pass rate:       {:11.2}%", pass_rate);
        }

        println!("\nFramebuffer Operations:");
        println!("  framebuffer clear calls:    {:12}", self.framebuffer_clear_calls);
        println!("  snapshots saved:            {:12}", self.snapshot_saves);

        println!();
    }
}

/// Global function counters instance
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Macro for adding to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
