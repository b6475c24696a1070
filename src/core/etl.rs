use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        tracing::info!("🚀 Starting {} pipeline", name);

        // Extract
        tracing::debug!("Extracting data...");
        let extracted = self.pipeline.extract().await?;
        self.monitor.log_stats(name, "extract");

        // Transform
        tracing::debug!("Transforming data...");
        let transformed = self.pipeline.transform(extracted).await?;
        self.monitor.log_stats(name, "transform");

        // Load
        tracing::debug!("Loading data...");
        let output_path = self.pipeline.load(transformed).await?;
        self.monitor.log_stats(name, "load");

        tracing::info!("✅ {} pipeline finished, output: {}", name, output_path);
        self.monitor.log_final_stats(name);

        Ok(output_path)
    }
}
