use crate::BlackMarbleError;
use std::{fmt, str::FromStr};

/// Black Marble product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    /// `VNP46A1`, daily at-sensor top-of-atmosphere radiance.
    DailyV1,
    /// `VNP46A2`, daily moonlight-adjusted and gap-filled radiance.
    DailyV2,
    /// `VNP46A3`, monthly composite.
    Monthly,
    /// `VNP46A4`, annual composite.
    Annual,
}

/// How a product's files are keyed in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Month,
    Year,
}

/// Container layout, which differs between product generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Daily products. Pixel extent comes from the tile grid.
    Tiled,
    /// Composites. Pixel extent comes from embedded `lat`/`lon` arrays.
    LatLon,
}

impl Generation {
    /// HDF-EOS group holding the data fields.
    pub fn group(self) -> &'static str {
        match self {
            Self::Tiled => "HDFEOS/GRIDS/VNP_Grid_DNB/Data Fields",
            Self::LatLon => "HDFEOS/GRIDS/VIIRS_Grid_DNB_2d/Data Fields",
        }
    }

    /// Full path of `field` inside the container.
    pub fn field_path(self, field: &str) -> String {
        format!("{}/{field}", self.group())
    }
}

impl Product {
    pub const ALL: [Self; 4] = [Self::DailyV1, Self::DailyV2, Self::Monthly, Self::Annual];

    /// Provider product ID, as it appears in file names and archive paths.
    pub fn id(self) -> &'static str {
        match self {
            Self::DailyV1 => "VNP46A1",
            Self::DailyV2 => "VNP46A2",
            Self::Monthly => "VNP46A3",
            Self::Annual => "VNP46A4",
        }
    }

    /// Variable used when the caller doesn't pick one.
    pub fn default_variable(self) -> &'static str {
        match self {
            Self::DailyV1 => "DNB_At_Sensor_Radiance_500m",
            Self::DailyV2 => "Gap_Filled_DNB_BRDF-Corrected_NTL",
            Self::Monthly | Self::Annual => "NearNadir_Composite_Snow_Free",
        }
    }

    pub fn granularity(self) -> Granularity {
        match self {
            Self::DailyV1 | Self::DailyV2 => Granularity::Day,
            Self::Monthly => Granularity::Month,
            Self::Annual => Granularity::Year,
        }
    }

    pub fn generation(self) -> Generation {
        match self {
            Self::DailyV1 | Self::DailyV2 => Generation::Tiled,
            Self::Monthly | Self::Annual => Generation::LatLon,
        }
    }

    /// Name of the quality flag field masking `variable`, if the
    /// product carries one.
    pub fn quality_field(self, variable: &str) -> Option<String> {
        match self {
            Self::DailyV1 => None,
            Self::DailyV2 => Some("Mandatory_Quality_Flag".to_string()),
            Self::Monthly | Self::Annual => Some(format!("{variable}_Quality")),
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Product {
    type Err = BlackMarbleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|product| product.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| BlackMarbleError::Product(s.to_string()))
    }
}

/// Returns true for fields where 65535 marks a saturated or invalid
/// radiance sample regardless of the declared fill value.
pub fn is_radiance(variable: &str) -> bool {
    const RADIANCE: [&str; 9] = [
        "DNB_At_Sensor_Radiance_500m",
        "DNB_BRDF-Corrected_NTL",
        "Gap_Filled_DNB_BRDF-Corrected_NTL",
        "AllAngle_Composite_Snow_Covered",
        "AllAngle_Composite_Snow_Free",
        "NearNadir_Composite_Snow_Covered",
        "NearNadir_Composite_Snow_Free",
        "OffNadir_Composite_Snow_Covered",
        "OffNadir_Composite_Snow_Free",
    ];
    RADIANCE.contains(&variable)
}
