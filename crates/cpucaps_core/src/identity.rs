//! Processor vendor and version information

use core::fmt::{self, Write};

use cpucaps_base::EnumFromIndexT;
use cpucaps_macros::{EnumDisplay, EnumFromIndex};

use crate::fmt::Indenter;

/// Length of the vendor ID, without null-terminator.
pub const VENDOR_ID_LEN: usize = 12;
/// Minimum capacity of a buffer receiving the vendor ID, including the null-terminator.
pub const VENDOR_ID_CAPACITY: usize = VENDOR_ID_LEN + 1;
/// Capacity of a buffer receiving the brand string, including the null-terminator.
pub const BRAND_STRING_CAPACITY: usize = 48;

/// CPU manufacturer, identified by the vendor ID in `cpuid(eax=0)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Manufacturer {
    /// Early engineering samples of the AMD K5 processor: "AMDisbetter!"
    EarlyAMD,
    /// AMD: "AuthenticAMD"
    AMD,
    /// IDT WinChip/Centaur (including some VIA and Zhaoxin CPUs): "CentaurHauls"
    Centaur,
    /// Cyrix/early STMicroelectronics and IBM: "CyrixInstead"
    Cyrix,
    /// Intel: "GenuineIntel"
    Intel,
    /// Transmeta: "TransmetaCPU" or "GenuineTMx86"
    Transmeta,
    /// National Semiconductor: "Geode by NSC"
    NationalSemiconductor,
    /// NexGen: "NexGenDriven"
    NexGen,
    /// Rise: "RiseRiseRise"
    Rise,
    /// SiS (Silicon Integrated Systems): "SiS SiS SiS "
    SIS,
    /// UMC (United Microelectronics Corporation): "UMC UMC UMC "
    UMC,
    /// VIA (VIA Technologies Inc.): "VIA VIA VIA "
    VIA,
    /// DM&P Vortex86: "Vortex86 SoC"
    Vortex86,
    /// Zhaoxin: "  Shanghai  "
    Zhaoxin,
    /// Hygon: "HygonGenuine"
    Hygon,
    /// Microsoft Hyper-V or Windows Virtual PC: "Microsoft Hv"
    HyperV,
    /// KVM: "KVMKVMKVM\0\0\0"
    KVM,
    /// QEMU: "TCGTCGTCGTCG"
    QEMU,
    /// VMware: "VMwareVMware"
    VMware,
    /// Xen HVM: "XenVMMXenVMM"
    XenHVM,
    /// Apple Rosetta 2: "VirtualApple"
    AppleRosetta,
    /// Unknown vendor ID
    Unknown([u8; VENDOR_ID_LEN]),
}

const KNOWN_VENDORS: &[(&[u8; VENDOR_ID_LEN], Manufacturer)] = &[
    (b"AMDisbetter!", Manufacturer::EarlyAMD),
    (b"AuthenticAMD", Manufacturer::AMD),
    (b"CentaurHauls", Manufacturer::Centaur),
    (b"CyrixInstead", Manufacturer::Cyrix),
    (b"GenuineIntel", Manufacturer::Intel),
    (b"TransmetaCPU", Manufacturer::Transmeta),
    (b"GenuineTMx86", Manufacturer::Transmeta),
    (b"Geode by NSC", Manufacturer::NationalSemiconductor),
    (b"NexGenDriven", Manufacturer::NexGen),
    (b"RiseRiseRise", Manufacturer::Rise),
    (b"SiS SiS SiS ", Manufacturer::SIS),
    (b"UMC UMC UMC ", Manufacturer::UMC),
    (b"VIA VIA VIA ", Manufacturer::VIA),
    (b"Vortex86 SoC", Manufacturer::Vortex86),
    (b"  Shanghai  ", Manufacturer::Zhaoxin),
    (b"HygonGenuine", Manufacturer::Hygon),
    (b"Microsoft Hv", Manufacturer::HyperV),
    (b"KVMKVMKVM\0\0\0", Manufacturer::KVM),
    (b"TCGTCGTCGTCG", Manufacturer::QEMU),
    (b"VMwareVMware", Manufacturer::VMware),
    (b"XenVMMXenVMM", Manufacturer::XenHVM),
    (b"VirtualApple", Manufacturer::AppleRosetta),
];

impl Manufacturer {
    /// Identify the manufacturer from the 12 vendor ID bytes.
    pub fn from_vendor_id(vendor_id: &[u8; VENDOR_ID_LEN]) -> Self {
        KNOWN_VENDORS.iter()
            .find(|(id, _)| *id == vendor_id)
            .map_or(Manufacturer::Unknown(*vendor_id), |(_, manufacturer)| *manufacturer)
    }
}

impl Default for Manufacturer {
    fn default() -> Self {
        Manufacturer::Unknown([0; VENDOR_ID_LEN])
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Manufacturer::EarlyAMD              => f.write_str("AMD, early engineering sample of the AMD K5"),
            Manufacturer::AMD                   => f.write_str("AMD"),
            Manufacturer::Centaur               => f.write_str("IDT WinChip/Centaur"),
            Manufacturer::Cyrix                 => f.write_str("Cyrix"),
            Manufacturer::Intel                 => f.write_str("Intel"),
            Manufacturer::Transmeta             => f.write_str("Transmeta"),
            Manufacturer::NationalSemiconductor => f.write_str("National Semiconductor"),
            Manufacturer::NexGen                => f.write_str("NexGen"),
            Manufacturer::Rise                  => f.write_str("Rise"),
            Manufacturer::SIS                   => f.write_str("Silicon Integrated Systems"),
            Manufacturer::UMC                   => f.write_str("United Microelectronics Corporation"),
            Manufacturer::VIA                   => f.write_str("VIA Technologies Inc."),
            Manufacturer::Vortex86              => f.write_str("DM&P Vortex86"),
            Manufacturer::Zhaoxin               => f.write_str("Zhaoxin"),
            Manufacturer::Hygon                 => f.write_str("Hygon"),
            Manufacturer::HyperV                => f.write_str("Microsoft Hyper-V"),
            Manufacturer::KVM                   => f.write_str("KVM (Kernel-based Virtual Machine)"),
            Manufacturer::QEMU                  => f.write_str("QEMU (Quick Emulator)"),
            Manufacturer::VMware                => f.write_str("VMware"),
            Manufacturer::XenHVM                => f.write_str("Xen HVM"),
            Manufacturer::AppleRosetta          => f.write_str("Apple Rosetta 2"),
            Manufacturer::Unknown(arr)          => write!(f, "Unknown ({:02X?})", arr),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumDisplay, Default, EnumFromIndex)]
pub enum ProcessorType {
    #[default]
    #[display("OEM")]
    OEM,
    #[display("Intel OverDrive")]
    IntelOverdrive,
    #[display("Dual processor")]
    DualProcessor,
    #[display("Reserved")]
    Reserved
}

/// Version information from `cpuid(eax=1).eax`, as raw sub-fields.
/// 
/// The fields are not merged, use [`ProcessorIdentity::effective_family`] and [`ProcessorIdentity::effective_model`] for the display values.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ProcessorIdentity {
    /// Bits 0..=3
    pub stepping:        u8,
    /// Bits 4..=7
    pub model:           u8,
    /// Bits 8..=11
    pub family:          u8,
    /// Bits 12..=13
    pub processor_type:  ProcessorType,
    /// Bits 16..=19
    pub extended_model:  u8,
    /// Bits 20..=27
    pub extended_family: u8,
}

impl ProcessorIdentity {
    /// Slice the version information register into its sub-fields.
    pub fn from_version_info(eax: u32) -> Self {
        Self {
            stepping:        (eax & 0xF) as u8,
            model:           ((eax >> 4) & 0xF) as u8,
            family:          ((eax >> 8) & 0xF) as u8,
            processor_type:  ProcessorType::from_idx_or(((eax >> 12) & 0x3) as usize, ProcessorType::Reserved),
            extended_model:  ((eax >> 16) & 0xF) as u8,
            extended_family: ((eax >> 20) & 0xFF) as u8,
        }
    }

    /// Family as documented by Intel and AMD: the extended family is only added for family 15.
    pub fn effective_family(&self) -> u32 {
        if self.family == 15 {
            self.extended_family as u32 + self.family as u32
        } else {
            self.family as u32
        }
    }

    /// Model as documented by Intel and AMD: the extended model is only used for family 6 and 15.
    pub fn effective_model(&self) -> u32 {
        if self.family == 6 || self.family == 15 {
            ((self.extended_model as u32) << 4) + self.model as u32
        } else {
            self.model as u32
        }
    }

    /// Merge the fields the way the first library revision did.
    pub fn to_legacy(&self) -> LegacyIdentity {
        LegacyIdentity {
            family:   self.family as u32 + self.extended_family as u32,
            model:    self.model as u32 + ((self.extended_model as u32) << 4),
            stepping: self.stepping as u32,
        }
    }
}

impl fmt::Display for ProcessorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processor identity:")?;

        let mut indenter = Indenter::new(f);
        writeln!(indenter, "Type:            {}", self.processor_type)?;
        writeln!(indenter, "Family:          {:#X} (raw {:#X}, extended {:#X})", self.effective_family(), self.family, self.extended_family)?;
        writeln!(indenter, "Model:           {:#X} (raw {:#X}, extended {:#X})", self.effective_model(), self.model, self.extended_model)?;
        write!  (indenter, "Stepping:        {}", self.stepping)
    }
}

/// Version information in the shape of the first library revision.
/// 
/// The extended fields are always merged in, regardless of the base family, and there is no processor type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LegacyIdentity {
    /// Base family + extended family
    pub family:   u32,
    /// Base model + (extended model << 4)
    pub model:    u32,
    pub stepping: u32,
}

impl LegacyIdentity {
    pub fn from_version_info(eax: u32) -> Self {
        Self {
            family:   ((eax >> 8) & 0xF) + ((eax >> 20) & 0xFF),
            model:    ((eax >> 4) & 0xF) + ((eax >> 12) & 0xF0),
            stepping: eax & 0xF,
        }
    }
}

impl fmt::Display for LegacyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Family={}, Model={}, Stepping={}", self.family, self.model, self.stepping)
    }
}
