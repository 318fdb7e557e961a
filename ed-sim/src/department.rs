//! The emergency department: its resources, service times and routing draws.

use std::cell::RefCell;
use std::collections::BTreeMap;

use edsim_core::{
    Chance, PoissonArrivals, Resource, ResourceStats, SimContext, SimError, SimTime, Triangular,
    WeightedChoice,
};
use metrics::{counter, histogram};
use tracing::{debug, trace};

use crate::config::EdConfig;
use crate::patient::{CasualtyWard, PatientRecord, PatientType};
use crate::stats::StatisticsAggregator;

/// Counter of patients that left the department, labelled by `type`.
pub const PATIENTS_COMPLETED: &str = "edsim_patients_completed_total";
/// Histogram of total time in the department, labelled by `type`.
pub const TIME_IN_SYSTEM: &str = "edsim_time_in_system_minutes";
/// Histogram of time spent queueing for a unit, labelled by `resource`.
pub const RESOURCE_WAIT: &str = "edsim_resource_wait_minutes";

/// Everything a patient can meet on the way through the department.
///
/// One department belongs to one simulation; it is shared between the
/// arrival generator and all patient processes behind an `Rc`.
#[derive(Debug)]
pub struct EmergencyDepartment {
    registration: Resource,
    ward_a: Resource,
    ward_b: Resource,
    x_ray: Resource,
    plaster: Resource,

    registration_time: Triangular,
    ward_a_time: Triangular,
    ward_b_time: Triangular,
    x_ray_time: Triangular,
    plaster_time: Triangular,

    ward_split: Chance,
    patient_types: WeightedChoice<PatientType>,
    arrivals: PoissonArrivals,
    staff_arrival: SimTime,

    stats: RefCell<StatisticsAggregator>,
}

impl EmergencyDepartment {
    /// Build the department for `config` on the given simulation.
    pub fn new(ctx: &SimContext, config: &EdConfig) -> Result<Self, SimError> {
        let caps = &config.capacities;
        let times = &config.service_times;

        let department = Self {
            registration: Resource::new(ctx, "registration", caps.registration)?,
            ward_a: Resource::new(ctx, "ward_a", caps.ward_a)?,
            ward_b: Resource::new(ctx, "ward_b", caps.ward_b)?,
            x_ray: Resource::new(ctx, "x_ray", caps.x_ray)?,
            plaster: Resource::new(ctx, "plaster", caps.plaster)?,

            registration_time: Triangular::try_from(times.registration)?,
            ward_a_time: Triangular::try_from(times.ward_a)?,
            ward_b_time: Triangular::try_from(times.ward_b)?,
            x_ray_time: Triangular::try_from(times.x_ray)?,
            plaster_time: Triangular::try_from(times.plaster)?,

            ward_split: Chance::new(config.ward_a_probability)?,
            patient_types: WeightedChoice::new(PatientType::ALL.to_vec(), &config.type_weights)?,
            arrivals: PoissonArrivals::from_mean_interarrival(config.mean_interarrival)?,
            staff_arrival: SimTime::new(config.staff_arrival)?,

            stats: RefCell::new(StatisticsAggregator::new()),
        };

        debug!(
            staff_arrival = %department.staff_arrival,
            mean_interarrival = config.mean_interarrival,
            "Emergency department set up"
        );
        Ok(department)
    }

    pub fn registration(&self) -> &Resource {
        &self.registration
    }

    pub fn registration_time(&self) -> &Triangular {
        &self.registration_time
    }

    pub fn x_ray(&self) -> &Resource {
        &self.x_ray
    }

    pub fn x_ray_time(&self) -> &Triangular {
        &self.x_ray_time
    }

    pub fn plaster(&self) -> &Resource {
        &self.plaster
    }

    pub fn plaster_time(&self) -> &Triangular {
        &self.plaster_time
    }

    /// The resource and service time of a casualty ward.
    pub fn ward(&self, ward: CasualtyWard) -> (&Resource, &Triangular) {
        match ward {
            CasualtyWard::A => (&self.ward_a, &self.ward_a_time),
            CasualtyWard::B => (&self.ward_b, &self.ward_b_time),
        }
    }

    /// When the casualty ward staff comes on duty.
    pub fn staff_arrival(&self) -> SimTime {
        self.staff_arrival
    }

    pub fn arrivals(&self) -> &PoissonArrivals {
        &self.arrivals
    }

    /// Draw the casualty ward for a freshly registered patient.
    pub fn assign_ward(&self, ctx: &SimContext) -> CasualtyWard {
        if ctx.with_rng(|rng| rng.chance(&self.ward_split)) {
            CasualtyWard::A
        } else {
            CasualtyWard::B
        }
    }

    /// Draw the type of a new patient.
    pub fn draw_patient_type(&self, ctx: &SimContext) -> PatientType {
        ctx.with_rng(|rng| *rng.choose(&self.patient_types))
    }

    /// Wait for a unit of `resource`, hold it for a service time drawn from
    /// `time`, then release it.
    ///
    /// The service time is drawn once the unit is granted.
    pub async fn serve(
        &self,
        ctx: &SimContext,
        resource: &Resource,
        time: &Triangular,
    ) -> Result<(), SimError> {
        let requested = ctx.now();
        let permit = resource.acquire().await;
        histogram!(RESOURCE_WAIT, "resource" => resource.name().to_string())
            .record(ctx.now().duration_since(requested));

        let duration = ctx.service_time(time);
        trace!(resource = resource.name(), duration, time = %ctx.now(), "Service started");
        ctx.timeout(duration).await?;
        permit.release()
    }

    pub(crate) fn record(&self, record: PatientRecord) {
        let label = record.patient_type.to_string();
        counter!(PATIENTS_COMPLETED, "type" => label.clone()).increment(1);
        histogram!(TIME_IN_SYSTEM, "type" => label).record(record.total_time());
        self.stats.borrow_mut().record(record);
    }

    /// Completed patients so far.
    pub fn completed(&self) -> usize {
        self.stats.borrow().len()
    }

    /// Hand the collected statistics over, leaving an empty aggregator.
    pub fn take_statistics(&self) -> StatisticsAggregator {
        self.stats.take()
    }

    /// Per-resource counters, keyed by resource name.
    pub fn resource_stats(&self) -> BTreeMap<String, ResourceStats> {
        [
            &self.registration,
            &self.ward_a,
            &self.ward_b,
            &self.x_ray,
            &self.plaster,
        ]
        .into_iter()
        .map(|r| (r.name().to_string(), r.stats()))
        .collect()
    }
}
