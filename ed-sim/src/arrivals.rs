//! Patient arrival process.

use std::rc::Rc;

use edsim_core::{SimContext, SimError};
use tracing::{debug, info};

use crate::department::EmergencyDepartment;
use crate::patient::Patient;

/// Generate `count` patients with exponentially distributed gaps.
///
/// Each patient waits out its gap first, so the first arrival is not at
/// time zero. The generator finishes right after the last patient is
/// spawned; patients already inside the department keep running.
pub async fn generate_patients(
    ctx: SimContext,
    ed: Rc<EmergencyDepartment>,
    count: usize,
) -> Result<(), SimError> {
    for id in 0..count {
        let gap = ctx.interarrival(ed.arrivals());
        ctx.timeout(gap).await?;

        let patient = Patient::new(id, ed.draw_patient_type(&ctx));
        debug!(patient = id, kind = %patient.patient_type, time = %ctx.now(), "Spawning patient");
        ctx.spawn(format!("patient-{id}"), patient.visit(ctx.clone(), Rc::clone(&ed)));
    }

    info!(patients = count, time = %ctx.now(), "Arrival process finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EdConfig;
    use edsim_core::{Simulation, SimulationState};

    #[test]
    fn test_generator_spawns_requested_patients() {
        let mut sim = Simulation::new(3);
        let ctx = sim.context();
        let ed = Rc::new(EmergencyDepartment::new(&ctx, &EdConfig::default()).unwrap());

        sim.spawn_generator("arrivals", generate_patients(ctx.clone(), Rc::clone(&ed), 20));
        let report = sim.run().unwrap();

        assert_eq!(report.state, SimulationState::Terminated);
        assert_eq!(report.stranded_processes, 0);
        assert_eq!(ed.completed(), 20);
    }

    #[test]
    fn test_zero_patients_ends_immediately() {
        let mut sim = Simulation::new(3);
        let ctx = sim.context();
        let ed = Rc::new(EmergencyDepartment::new(&ctx, &EdConfig::default()).unwrap());

        sim.spawn_generator("arrivals", generate_patients(ctx.clone(), Rc::clone(&ed), 0));
        let report = sim.run().unwrap();

        assert_eq!(report.final_time.as_f64(), 0.0);
        assert_eq!(ed.completed(), 0);
    }
}
