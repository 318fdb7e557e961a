//! Patients and their path through the department.
//!
//! Every patient registers, is assigned a casualty ward, waits for the ward
//! staff to come on duty if it arrived early, and is seen in that ward. What
//! happens next depends on the patient type:
//!
//! | Type | Continuation                       |
//! |------|------------------------------------|
//! | 1    | X-ray, ward                        |
//! | 2    | plaster                            |
//! | 3    | X-ray, plaster, X-ray, ward        |
//! | 4    | none                               |
//!
//! A patient holds at most one resource at a time.

use std::fmt;
use std::rc::Rc;

use edsim_core::{SimContext, SimError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::department::EmergencyDepartment;

/// The four routing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatientType {
    Type1,
    Type2,
    Type3,
    Type4,
}

/// One step after the first ward visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    XRay,
    Plaster,
    /// Back to the ward assigned at registration.
    Ward,
}

impl PatientType {
    pub const ALL: [PatientType; 4] = [
        PatientType::Type1,
        PatientType::Type2,
        PatientType::Type3,
        PatientType::Type4,
    ];

    /// 1-based type number, as used in reports.
    pub fn number(self) -> u8 {
        match self {
            PatientType::Type1 => 1,
            PatientType::Type2 => 2,
            PatientType::Type3 => 3,
            PatientType::Type4 => 4,
        }
    }

    /// Steps following the first ward visit.
    pub fn route(self) -> &'static [Step] {
        match self {
            PatientType::Type1 => &[Step::XRay, Step::Ward],
            PatientType::Type2 => &[Step::Plaster],
            PatientType::Type3 => &[Step::XRay, Step::Plaster, Step::XRay, Step::Ward],
            PatientType::Type4 => &[],
        }
    }
}

impl fmt::Display for PatientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type {}", self.number())
    }
}

/// The two parallel casualty wards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CasualtyWard {
    A,
    B,
}

impl fmt::Display for CasualtyWard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasualtyWard::A => f.write_str("ward A"),
            CasualtyWard::B => f.write_str("ward B"),
        }
    }
}

/// Outcome of one patient's visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: usize,
    pub patient_type: PatientType,
    pub ward: CasualtyWard,
    pub arrival: f64,
    pub departure: f64,
}

impl PatientRecord {
    /// Time spent in the department.
    pub fn total_time(&self) -> f64 {
        self.departure - self.arrival
    }
}

/// A patient about to enter the department.
#[derive(Debug, Clone, Copy)]
pub struct Patient {
    pub id: usize,
    pub patient_type: PatientType,
}

impl Patient {
    pub fn new(id: usize, patient_type: PatientType) -> Self {
        Self { id, patient_type }
    }

    /// Walk through the department and report the outcome to its statistics.
    pub async fn visit(self, ctx: SimContext, ed: Rc<EmergencyDepartment>) -> Result<(), SimError> {
        let arrival = ctx.now();
        debug!(patient = self.id, kind = %self.patient_type, time = %arrival, "Patient arrived");

        ed.serve(&ctx, ed.registration(), ed.registration_time()).await?;

        let ward = ed.assign_ward(&ctx);
        trace!(patient = self.id, %ward, "Casualty ward assigned");

        let on_duty = ed.staff_arrival();
        if ctx.now() < on_duty {
            ctx.timeout_until(on_duty).await?;
        }

        let (ward_resource, ward_time) = ed.ward(ward);
        ed.serve(&ctx, ward_resource, ward_time).await?;

        for step in self.patient_type.route() {
            let (resource, time) = match step {
                Step::XRay => (ed.x_ray(), ed.x_ray_time()),
                Step::Plaster => (ed.plaster(), ed.plaster_time()),
                Step::Ward => ed.ward(ward),
            };
            ed.serve(&ctx, resource, time).await?;
        }

        let departure = ctx.now();
        let record = PatientRecord {
            id: self.id,
            patient_type: self.patient_type,
            ward,
            arrival: arrival.as_f64(),
            departure: departure.as_f64(),
        };
        debug!(
            patient = self.id,
            total_time = record.total_time(),
            time = %departure,
            "Patient departed"
        );
        ed.record(record);
        Ok(())
    }
}
