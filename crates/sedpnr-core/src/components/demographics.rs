//! Demographics
//!
//! Ethnicity, denomination, and age-group categories, and the sampler that draws
//! them from fixed empirical distributions.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Ethnic group, weighted to a Phoenix-like metro population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Ethnicity {
    White = 0,
    Hispanic = 1,
    Black = 2,
    Asian = 3,
    NativeAmerican = 4,
    Multiracial = 5,
}

impl Ethnicity {
    pub const ALL: [Ethnicity; 6] = [
        Ethnicity::White,
        Ethnicity::Hispanic,
        Ethnicity::Black,
        Ethnicity::Asian,
        Ethnicity::NativeAmerican,
        Ethnicity::Multiracial,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Religious denomination. `None` means unaffiliated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Denomination {
    None = 0,
    Catholic = 1,
    Evangelical = 2,
    Mainline = 3,
    Lds = 4,
    Jewish = 5,
    Muslim = 6,
    Buddhist = 7,
    Hindu = 8,
}

impl Denomination {
    /// Denominations that have their own religious sites.
    pub const AFFILIATED: [Denomination; 8] = [
        Denomination::Catholic,
        Denomination::Evangelical,
        Denomination::Mainline,
        Denomination::Lds,
        Denomination::Jewish,
        Denomination::Muslim,
        Denomination::Buddhist,
        Denomination::Hindu,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_affiliated(self) -> bool {
        self != Denomination::None
    }
}

/// Coarse age bands used for network formation and sharing behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    /// 0-12
    Child,
    /// 13-19
    Teen,
    /// 20-35
    YoungAdult,
    /// 36-55
    Adult,
    /// 56+
    Senior,
}

impl AgeGroup {
    pub fn of(age: u32) -> Self {
        match age {
            0..=12 => AgeGroup::Child,
            13..=19 => AgeGroup::Teen,
            20..=35 => AgeGroup::YoungAdult,
            36..=55 => AgeGroup::Adult,
            _ => AgeGroup::Senior,
        }
    }

    /// How readily this group passes claims on.
    pub fn passing_frequency(self) -> f64 {
        match self {
            AgeGroup::Child => 0.5,
            AgeGroup::Teen => 1.5,
            AgeGroup::YoungAdult => 1.2,
            AgeGroup::Adult => 1.0,
            AgeGroup::Senior => 0.8,
        }
    }
}

/// Age buckets: (cumulative weight, min age, max age). The last bucket absorbs the rest.
const AGE_BUCKETS: [(f64, u32, u32); 5] = [
    (0.15, 0, 12),
    (0.25, 13, 19),
    (0.50, 20, 35),
    (0.80, 36, 60),
    (1.00, 61, 90),
];

const ETHNICITY_WEIGHTS: [(Ethnicity, f64); 5] = [
    (Ethnicity::White, 0.42),
    (Ethnicity::Hispanic, 0.42),
    (Ethnicity::Black, 0.06),
    (Ethnicity::Asian, 0.04),
    (Ethnicity::NativeAmerican, 0.02),
];

const DENOMINATION_WEIGHTS: [(Denomination, f64); 8] = [
    (Denomination::Catholic, 0.21),
    (Denomination::Evangelical, 0.16),
    (Denomination::Mainline, 0.07),
    (Denomination::Lds, 0.06),
    (Denomination::Jewish, 0.01),
    (Denomination::Muslim, 0.01),
    (Denomination::Buddhist, 0.01),
    (Denomination::Hindu, 0.01),
];

const EDUCATION_MEAN: f64 = 2.5;
const EDUCATION_STD: f64 = 1.2;
const EDUCATION_MEAN_18_TO_21: f64 = 2.0;

/// Demographic attributes of one synthetic inhabitant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u32,
    pub ethnicity: Ethnicity,
    pub denomination: Denomination,
    pub education: u8,
}

/// Draws demographic attributes. Every draw is total over [0, 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct DemographicSampler;

impl DemographicSampler {
    pub fn new() -> Self {
        Self
    }

    /// Draw a full set of attributes.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Demographics {
        let age = self.sample_age(rng.gen(), rng);
        let ethnicity = self.sample_ethnicity(rng.gen());
        let denomination = self.sample_denomination(rng.gen());
        let education = self.sample_education(age, rng);
        Demographics {
            age,
            ethnicity,
            denomination,
            education,
        }
    }

    /// Pick an age bucket with `u`, then an age uniformly within it.
    pub fn sample_age<R: Rng>(&self, u: f64, rng: &mut R) -> u32 {
        let (_, min, max) = AGE_BUCKETS
            .iter()
            .copied()
            .find(|(cumulative, _, _)| u < *cumulative)
            .unwrap_or(AGE_BUCKETS[AGE_BUCKETS.len() - 1]);
        rng.gen_range(min..=max)
    }

    pub fn sample_ethnicity(&self, u: f64) -> Ethnicity {
        pick_categorical(u, &ETHNICITY_WEIGHTS, Ethnicity::Multiracial)
    }

    pub fn sample_denomination(&self, u: f64) -> Denomination {
        pick_categorical(u, &DENOMINATION_WEIGHTS, Denomination::None)
    }

    /// Education level 0-5, normally distributed around an age-dependent mean.
    pub fn sample_education<R: Rng>(&self, age: u32, rng: &mut R) -> u8 {
        let mean = education_mean(age);
        let noise: f64 = rng.sample(StandardNormal);
        let drawn = mean + EDUCATION_STD * noise;
        drawn.round().clamp(0.0, 5.0) as u8
    }
}

fn education_mean(age: u32) -> f64 {
    match age {
        0..=17 => (age as f64 / 4.0).min(EDUCATION_MEAN),
        18..=21 => EDUCATION_MEAN_18_TO_21,
        _ => EDUCATION_MEAN,
    }
}

/// Walk cumulative weights; whatever is left over maps to `fallback`.
fn pick_categorical<T: Copy>(u: f64, weights: &[(T, f64)], fallback: T) -> T {
    let mut cumulative = 0.0;
    for &(value, weight) in weights {
        cumulative += weight;
        if u < cumulative {
            return value;
        }
    }
    fallback
}
