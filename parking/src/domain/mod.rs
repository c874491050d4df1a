pub mod billing;
pub mod plate;

pub mod prelude {
    pub use super::{
        billing::Fare,
        exit::{PaymentMethod, VehicleExit},
        layout::LotLayout,
        spot::{OccupiedSpot, SpotNumber, VehicleType},
    };
}

pub mod spot {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    use super::billing::{CAR_HOURLY_RATE, MOTORCYCLE_HOURLY_RATE};

    /// Number painted on a parking space.
    pub type SpotNumber = u32;

    #[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[serde(rename_all = "lowercase")]
    pub enum VehicleType {
        Car,
        Motorcycle,
    }

    impl VehicleType {
        /// Price charged per hour of occupation, proportional to the time spent.
        pub fn hourly_rate(self) -> f64 {
            match self {
                Self::Car => CAR_HOURLY_RATE,
                Self::Motorcycle => MOTORCYCLE_HOURLY_RATE,
            }
        }

        /// Rate as shown on the pricing table (ex. "R$ 10,00/h").
        pub fn rate_label(self) -> String {
            format!("{}/h", super::billing::format_currency(self.hourly_rate()))
        }

        pub fn label(self) -> &'static str {
            match self {
                Self::Car => "Carro",
                Self::Motorcycle => "Moto",
            }
        }

        pub fn as_str(self) -> &'static str {
            match self {
                Self::Car => "car",
                Self::Motorcycle => "motorcycle",
            }
        }
    }

    impl std::fmt::Display for VehicleType {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl std::str::FromStr for VehicleType {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "car" => Ok(Self::Car),
                "motorcycle" => Ok(Self::Motorcycle),
                _ => Err(()),
            }
        }
    }

    /// Domain model for a vehicle currently parked on a spot.
    ///
    /// The entry time is fixed when the spot is occupied and never changes
    /// afterwards.
    ///
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct OccupiedSpot {
        pub spot_number: SpotNumber,
        pub license_plate: String,
        pub vehicle_type: VehicleType,
        pub entry_time: DateTime<Utc>,
    }
}

pub mod exit {
    use serde::{Deserialize, Serialize};

    use super::spot::{SpotNumber, VehicleType};

    #[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[serde(rename_all = "lowercase")]
    pub enum PaymentMethod {
        Pix,
        Card,
        Cash,
    }

    impl PaymentMethod {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Pix => "pix",
                Self::Card => "card",
                Self::Cash => "cash",
            }
        }

        pub fn label(self) -> &'static str {
            match self {
                Self::Pix => "PIX",
                Self::Card => "Cartão",
                Self::Cash => "Dinheiro",
            }
        }
    }

    impl std::fmt::Display for PaymentMethod {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl std::str::FromStr for PaymentMethod {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "pix" => Ok(Self::Pix),
                "card" => Ok(Self::Card),
                "cash" => Ok(Self::Cash),
                _ => Err(()),
            }
        }
    }

    /// Domain model for a completed visit.
    ///
    /// Every field is already formatted for display; records are never
    /// modified once they enter the history.
    ///
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct VehicleExit {
        pub license_plate: String,
        pub vehicle_type: VehicleType,
        pub spot: SpotNumber,
        pub entry_time: String,
        pub exit_time: String,
        pub duration: String,
        pub value: String,
        pub payment_method: PaymentMethod,
    }
}

pub mod layout {
    use std::ops::RangeInclusive;

    use super::spot::{SpotNumber, VehicleType};

    /// Partition of the lot into car and motorcycle spots.
    ///
    /// The store never checks a spot against its range; the layout is only
    /// consulted by the presentation layer to decide which vehicle type a
    /// spot takes.
    ///
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LotLayout {
        pub car_spots: RangeInclusive<SpotNumber>,
        pub motorcycle_spots: RangeInclusive<SpotNumber>,
    }

    impl LotLayout {
        /// 30 car spots (1-30) followed by 30 motorcycle spots (31-60).
        pub fn standard() -> Self {
            Self {
                car_spots: 1..=30,
                motorcycle_spots: 31..=60,
            }
        }

        pub fn vehicle_type_for(&self, spot: SpotNumber) -> Option<VehicleType> {
            if self.car_spots.contains(&spot) {
                Some(VehicleType::Car)
            } else if self.motorcycle_spots.contains(&spot) {
                Some(VehicleType::Motorcycle)
            } else {
                None
            }
        }

        pub fn spots(&self, vehicle_type: VehicleType) -> RangeInclusive<SpotNumber> {
            match vehicle_type {
                VehicleType::Car => self.car_spots.clone(),
                VehicleType::Motorcycle => self.motorcycle_spots.clone(),
            }
        }

        pub fn capacity(&self, vehicle_type: VehicleType) -> usize {
            self.spots(vehicle_type).count()
        }
    }

    impl Default for LotLayout {
        fn default() -> Self {
            Self::standard()
        }
    }
}
