use super::RivetDeviceContextNull;
use crate::{RivetApiDef, RivetResult};

/// Null-specific configuration
#[derive(Clone, Debug, Default)]
pub struct RivetApiDefNull {
    /// Creation fails once this many native objects are alive. Used to exercise failure paths.
    pub max_live_objects: Option<usize>,
}

pub struct RivetApiNull {
    device_context: RivetDeviceContextNull,
    destroyed: bool,
}

impl RivetApiNull {
    pub fn device_context(&self) -> &RivetDeviceContextNull {
        &self.device_context
    }

    pub fn new(
        api_def: &RivetApiDef,
        null_api_def: &RivetApiDefNull,
    ) -> RivetResult<Self> {
        log::info!(
            "Initializing null backend (validation {})",
            if api_def.validation_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );

        let device_context = RivetDeviceContextNull::new(api_def, null_api_def);
        Ok(RivetApiNull {
            device_context,
            destroyed: false,
        })
    }

    pub fn destroy(&mut self) -> RivetResult<()> {
        if self.destroyed {
            return Ok(());
        }

        self.destroyed = true;
        profiling::scope!("RivetApiNull::destroy");

        let leaked = self.device_context.live_objects();
        if !leaked.is_empty() {
            for (id, object_type) in &leaked {
                log::error!("Native {:?} {} was never destroyed", object_type, id);
            }

            Err(format!(
                "{} native objects were still alive when the API was destroyed",
                leaked.len()
            ))?;
        }

        log::info!("Null backend destroyed");
        Ok(())
    }
}

impl Drop for RivetApiNull {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::error!("Error while dropping RivetApiNull: {}", e);
        }
    }
}
