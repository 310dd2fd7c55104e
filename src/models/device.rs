use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveKind {
    Ata,
    Scsi,
    Nvme,
}

impl DriveKind {
    /// Four-character interface tag stored in the FARM container header.
    pub fn interface_tag(&self) -> &'static str {
        match self {
            DriveKind::Ata  => "SATA",
            DriveKind::Scsi => "SAS ",
            DriveKind::Nvme => "NVMe",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DriveKind::Ata  => "ATA",
            DriveKind::Scsi => "SCSI",
            DriveKind::Nvme => "NVMe",
        }
    }
}

/// Physical attachment of the drive to the host. An ATA drive behind anything
/// other than a native IDE/SATA controller is reached through a SCSI/ATA
/// translation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachInterface {
    Ide,
    Sata,
    Sas,
    Usb,
    Raid,
    Nvme,
    Unknown,
}

impl AttachInterface {
    pub fn is_ide(&self) -> bool {
        matches!(self, AttachInterface::Ide | AttachInterface::Sata)
    }
}

/// Vendor family tag supplied by the identity collaborator. Selects the
/// attribute name and raw interpretation tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VendorFamily {
    Seagate,
    SeagateVendorB,
    SeagateVendorC,
    SeagateVendorD,
    SeagateVendorE,
    SeagateVendorF,
    SeagateVendorG,
    SeagateVendorK,
    SeagateConner,
    SeagateQuantum,
    Samsung,
    Maxtor,
    Default,
}

impl VendorFamily {
    pub const ALL: [VendorFamily; 13] = [
        VendorFamily::Seagate,
        VendorFamily::SeagateVendorB,
        VendorFamily::SeagateVendorC,
        VendorFamily::SeagateVendorD,
        VendorFamily::SeagateVendorE,
        VendorFamily::SeagateVendorF,
        VendorFamily::SeagateVendorG,
        VendorFamily::SeagateVendorK,
        VendorFamily::SeagateConner,
        VendorFamily::SeagateQuantum,
        VendorFamily::Samsung,
        VendorFamily::Maxtor,
        VendorFamily::Default,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VendorFamily::Seagate        => "seagate",
            VendorFamily::SeagateVendorB => "seagate-vendor-b",
            VendorFamily::SeagateVendorC => "seagate-vendor-c",
            VendorFamily::SeagateVendorD => "seagate-vendor-d",
            VendorFamily::SeagateVendorE => "seagate-vendor-e",
            VendorFamily::SeagateVendorF => "seagate-vendor-f",
            VendorFamily::SeagateVendorG => "seagate-vendor-g",
            VendorFamily::SeagateVendorK => "seagate-vendor-k",
            VendorFamily::SeagateConner  => "seagate-conner",
            VendorFamily::SeagateQuantum => "seagate-quantum",
            VendorFamily::Samsung        => "samsung",
            VendorFamily::Maxtor         => "maxtor",
            VendorFamily::Default        => "default",
        }
    }
}

impl fmt::Display for VendorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VendorFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        VendorFamily::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| format!("unknown vendor family '{}'", s))
    }
}

/// Identity strings reported by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub model:    String,
    pub serial:   String,
    pub firmware: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_tags_are_four_bytes() {
        for kind in [DriveKind::Ata, DriveKind::Scsi, DriveKind::Nvme] {
            assert_eq!(kind.interface_tag().len(), 4);
        }
        assert_eq!(DriveKind::Scsi.interface_tag(), "SAS ");
    }

    #[test]
    fn family_names_parse_back() {
        for family in VendorFamily::ALL {
            assert_eq!(family.name().parse::<VendorFamily>().unwrap(), family);
        }
        assert_eq!("Seagate_Vendor_K".parse::<VendorFamily>().unwrap(), VendorFamily::SeagateVendorK);
        assert!("hitachi".parse::<VendorFamily>().is_err());
    }
}
