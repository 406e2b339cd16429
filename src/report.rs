use core::fmt::{self, Write};

use cpucaps_core::{
    exports::library_version,
    fmt::Indenter,
    *,
};

/// Everything the prober can detect, gathered at once.
#[derive(Clone, Debug)]
pub struct CpuReport {
    pub library_version:    (u16, u16),
    pub architecture:       ArchitectureMode,
    pub logical_processors: u32,
    pub count_scope:        CountScope,
    pub vendor_id:          Option<String>,
    pub manufacturer:       Manufacturer,
    pub brand:              Option<String>,
    pub identity:           Option<ProcessorIdentity>,
    pub legacy_identity:    Option<LegacyIdentity>,
    pub capabilities:       CapabilitySet,
    pub layout:             MaskLayout,
    pub mask:               u64,
}

impl CpuReport {
    pub fn gather<Q: InstructionQuery, P: PlatformProvider>(prober: &Prober<Q, P>, layout: MaskLayout, count_scope: CountScope) -> Self {
        let capabilities = prober.query_capabilities();
        Self {
            library_version: library_version(),
            architecture: prober.query_architecture_mode(),
            logical_processors: prober.query_logical_processor_count(count_scope),
            count_scope,
            vendor_id: prober.vendor_id(),
            manufacturer: prober.manufacturer(),
            brand: prober.brand_string(),
            identity: prober.query_processor_identity(),
            legacy_identity: prober.query_legacy_identity(),
            capabilities,
            layout,
            mask: layout.encode(&capabilities),
        }
    }
}

const NOT_AVAILABLE: &str = "N/A";

fn or_na(value: Option<&str>) -> &str {
    value.filter(|s| !s.is_empty()).unwrap_or(NOT_AVAILABLE)
}

impl fmt::Display for CpuReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CPU report (cpucaps {}.{}):", self.library_version.0, self.library_version.1)?;

        let mut indenter = Indenter::new(f);
        writeln!(indenter, "Architecture:       {}", self.architecture)?;
        writeln!(indenter, "Logical processors: {} ({} mask)", self.logical_processors, self.count_scope)?;
        writeln!(indenter, "Vendor:             {} ({})", or_na(self.vendor_id.as_deref()), self.manufacturer)?;
        writeln!(indenter, "Brand:              {}", or_na(self.brand.as_deref()))?;

        match &self.identity {
            Some(identity) => writeln!(indenter, "{identity}")?,
            None => writeln!(indenter, "Processor identity: {NOT_AVAILABLE}")?,
        }
        match &self.legacy_identity {
            Some(legacy) => writeln!(indenter, "Legacy identity:    {legacy}")?,
            None => writeln!(indenter, "Legacy identity:    {NOT_AVAILABLE}")?,
        }

        if self.capabilities.is_empty() {
            writeln!(indenter, "Capabilities:       {NOT_AVAILABLE}")?;
        } else {
            writeln!(indenter, "Capabilities ({}):", self.capabilities.len())?;
            indenter.set_spaces(8);
            writeln!(indenter, "{}", self.capabilities)?;
            indenter.set_spaces(4);
        }

        let width = self.layout.bits() as usize / 4 + 2;
        writeln!(indenter, "Mask, {}: {:#0width$X}", self.layout, self.mask)?;
        indenter.set_spaces(8);
        for name in self.layout.flag_names(self.mask) {
            writeln!(indenter, "{name}")?;
        }
        Ok(())
    }
}
