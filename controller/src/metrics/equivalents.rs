use serde::Serialize;
use serde_json::Value;

use super::fields::first_number;

pub const GRAMS_PER_KG: f64 = 1_000.0;
pub const GRAMS_CO2_PER_CAR_KM: f64 = 120.0;
pub const GRAMS_CO2_PER_TREE: f64 = 22.0;
pub const GRAMS_CO2_PER_EMAIL: f64 = 4.0;
/// 10 W LED bulb.
pub const KWH_PER_BULB_HOUR: f64 = 0.010;
pub const KWH_PER_PHONE_CHARGE: f64 = 0.012;
/// 50 W laptop.
pub const KWH_PER_LAPTOP_HOUR: f64 = 0.050;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equivalents {
    pub trees_offset: Option<f64>,
    pub car_km: Option<f64>,
    pub emails: Option<f64>,
    pub bulb_hours: Option<f64>,
    pub phone_charges: Option<f64>,
    pub laptop_hours: Option<f64>,
}

impl Equivalents {
    /// Fixed linear conversions from grams of CO2 and kWh.
    pub fn compute(emissions_g: Option<f64>, energy_kwh: Option<f64>) -> Self {
        Self {
            trees_offset: emissions_g.map(|g| g / GRAMS_CO2_PER_TREE),
            car_km: emissions_g.map(|g| g / GRAMS_CO2_PER_CAR_KM),
            emails: emissions_g.map(|g| g / GRAMS_CO2_PER_EMAIL),
            bulb_hours: energy_kwh.map(|kwh| kwh / KWH_PER_BULB_HOUR),
            phone_charges: energy_kwh.map(|kwh| kwh / KWH_PER_PHONE_CHARGE),
            laptop_hours: energy_kwh.map(|kwh| kwh / KWH_PER_LAPTOP_HOUR),
        }
    }

    pub fn from_supplied(block: &Value) -> Self {
        Self {
            trees_offset: first_number(block, &[&["trees_offset"], &["trees"]]),
            car_km: first_number(block, &[&["car_km"], &["driving_km"]]),
            emails: first_number(block, &[&["emails"]]),
            bulb_hours: first_number(block, &[&["bulb_hours"], &["light_bulb_hours"]]),
            phone_charges: first_number(block, &[&["phone_charges"]]),
            laptop_hours: first_number(block, &[&["laptop_hours"]]),
        }
    }

    /// Field-wise merge where `self` wins and `fallback` fills gaps.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            trees_offset: self.trees_offset.or(fallback.trees_offset),
            car_km: self.car_km.or(fallback.car_km),
            emails: self.emails.or(fallback.emails),
            bulb_hours: self.bulb_hours.or(fallback.bulb_hours),
            phone_charges: self.phone_charges.or(fallback.phone_charges),
            laptop_hours: self.laptop_hours.or(fallback.laptop_hours),
        }
    }

    /// Supplied values first, recomputed values for anything the service left
    /// out.
    pub fn resolve(
        supplied: Option<&Value>,
        emissions_g: Option<f64>,
        energy_kwh: Option<f64>,
    ) -> Self {
        let computed = Self::compute(emissions_g, energy_kwh);
        match supplied {
            Some(block) => Self::from_supplied(block).or(computed),
            None => computed,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn kg_to_grams(kg: f64) -> f64 {
    kg * GRAMS_PER_KG
}
