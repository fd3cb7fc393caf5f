//! Classified road segments as read from map data.
//!
//! Mirrors the OSM way attributes and Belgian traffic signs that decide
//! whether a moped may use a way.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RoadType {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Residential,
    Cycleway,
    Path,
}

impl RoadType {
    /// Carriageways closed to every moped regardless of signage
    pub fn is_motorway_grade(&self) -> bool {
        matches!(self, Self::Motorway | Self::Trunk)
    }

    pub fn is_cycle_infrastructure(&self) -> bool {
        matches!(self, Self::Cycleway | Self::Path)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Surface {
    Asphalt,
    Cobblestone,
    Gravel,
}

/// Compact representation of the legal signs posted along a segment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignFlags {
    pub(crate) flags: u8,
}

impl SignFlags {
    pub const HAS_CYCLE_PATH: u8 = 1 << 0;
    /// D7: cycle path use is compulsory
    pub const CYCLE_PATH_COMPULSORY: u8 = 1 << 1;
    /// M sign: class B mopeds admitted on the cycle path
    pub const MOPEDS_ALLOWED_ON_CYCLE_PATH: u8 = 1 << 2;
    /// C6: no mopeds on the carriageway
    pub const MOPEDS_PROHIBITED_ON_ROAD: u8 = 1 << 3;
    pub const ONE_WAY_CAR: u8 = 1 << 4;
    /// M2/M3: mopeds exempt from the one-way restriction
    pub const ONE_WAY_MOPED_EXEMPT: u8 = 1 << 5;
    /// "Uitgezonderd plaatselijk verkeer"
    pub const DESTINATION_ONLY: u8 = 1 << 6;

    pub fn new() -> Self {
        Self { flags: 0 }
    }

    pub fn set(&mut self, flag: u8) {
        self.flags |= flag;
    }

    pub fn unset(&mut self, flag: u8) {
        self.flags &= !flag;
    }

    pub fn contains(&self, flag: u8) -> bool {
        (self.flags & flag) != 0
    }

    pub fn from_bools(
        has_cycle_path: bool,
        cycle_path_compulsory: bool,
        mopeds_allowed_on_cycle_path: bool,
        mopeds_prohibited_on_road: bool,
        one_way_car: bool,
        one_way_moped_exempt: bool,
        destination_only: bool,
    ) -> Self {
        let mut flags = Self::new();
        if has_cycle_path { flags.set(Self::HAS_CYCLE_PATH); }
        if cycle_path_compulsory { flags.set(Self::CYCLE_PATH_COMPULSORY); }
        if mopeds_allowed_on_cycle_path { flags.set(Self::MOPEDS_ALLOWED_ON_CYCLE_PATH); }
        if mopeds_prohibited_on_road { flags.set(Self::MOPEDS_PROHIBITED_ON_ROAD); }
        if one_way_car { flags.set(Self::ONE_WAY_CAR); }
        if one_way_moped_exempt { flags.set(Self::ONE_WAY_MOPED_EXEMPT); }
        if destination_only { flags.set(Self::DESTINATION_ONLY); }
        flags
    }
}

/// A classified way. Read-only input to the legality engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub road_type: RoadType,
    pub max_speed_kph: u32,
    pub surface: Surface,
    pub signs: SignFlags,
}

impl RoadSegment {
    pub fn has_cycle_path(&self) -> bool {
        self.signs.contains(SignFlags::HAS_CYCLE_PATH)
    }

    pub fn cycle_path_compulsory(&self) -> bool {
        self.signs.contains(SignFlags::CYCLE_PATH_COMPULSORY)
    }

    pub fn mopeds_allowed_on_cycle_path(&self) -> bool {
        self.signs.contains(SignFlags::MOPEDS_ALLOWED_ON_CYCLE_PATH)
    }

    pub fn mopeds_prohibited_on_road(&self) -> bool {
        self.signs.contains(SignFlags::MOPEDS_PROHIBITED_ON_ROAD)
    }

    pub fn one_way_car(&self) -> bool {
        self.signs.contains(SignFlags::ONE_WAY_CAR)
    }

    pub fn one_way_moped_exempt(&self) -> bool {
        self.signs.contains(SignFlags::ONE_WAY_MOPED_EXEMPT)
    }

    pub fn destination_only(&self) -> bool {
        self.signs.contains(SignFlags::DESTINATION_ONLY)
    }
}

impl Default for RoadSegment {
    fn default() -> Self {
        Self {
            road_type: RoadType::Residential,
            max_speed_kph: 50,
            surface: Surface::Asphalt,
            signs: SignFlags::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_flags() {
        let mut flags = SignFlags::new();
        flags.set(SignFlags::HAS_CYCLE_PATH);
        flags.set(SignFlags::MOPEDS_PROHIBITED_ON_ROAD);

        assert!(flags.contains(SignFlags::HAS_CYCLE_PATH));
        assert!(!flags.contains(SignFlags::ONE_WAY_CAR));
        assert!(flags.contains(SignFlags::MOPEDS_PROHIBITED_ON_ROAD));

        flags.unset(SignFlags::HAS_CYCLE_PATH);
        assert!(!flags.contains(SignFlags::HAS_CYCLE_PATH));
    }

    #[test]
    fn test_segment_accessors_follow_flags() {
        let segment = RoadSegment {
            signs: SignFlags::from_bools(true, false, true, false, true, true, false),
            ..RoadSegment::default()
        };

        assert!(segment.has_cycle_path());
        assert!(!segment.cycle_path_compulsory());
        assert!(segment.mopeds_allowed_on_cycle_path());
        assert!(!segment.mopeds_prohibited_on_road());
        assert!(segment.one_way_car());
        assert!(segment.one_way_moped_exempt());
        assert!(!segment.destination_only());
    }

    #[test]
    fn test_road_type_from_osm_tag() {
        assert_eq!("cycleway".parse::<RoadType>().ok(), Some(RoadType::Cycleway));
        assert_eq!("Motorway".parse::<RoadType>().ok(), Some(RoadType::Motorway));
        assert!("runway".parse::<RoadType>().is_err());
    }
}
