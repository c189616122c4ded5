//! Initial solution constructors.
//!
//! Each constructor places what it legally can and leaves the rest in
//! `unassigned`; none of them fail.

use std::cmp::Ordering;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::haversine::distance;
use crate::model::{Appointment, Location};
use crate::route::OptimizedRoute;
use crate::solution::{Problem, Solution};

const KMEANS_ROUNDS: usize = 20;
const SIMILAR_SERVICE_DISCOUNT: f64 = 0.9;

/// Problem appointments in constructor order: urgent first when preferred.
fn ordered_appointments(problem: &Problem) -> Vec<Arc<Appointment>> {
    let mut appointments = problem.appointments.clone();
    if problem.preferences.prioritize_urgent {
        appointments.sort_by(|a, b| b.priority.cmp(&a.priority));
    }
    appointments
}

fn last_location(route: &OptimizedRoute) -> &Location {
    route
        .appointments()
        .last()
        .map_or_else(|| route.technician().start_location(), |appointment| &appointment.location)
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Added distance of `candidate` over `route`, discounted when the stop
/// follows one of the same service type.
fn insertion_cost(
    route: &OptimizedRoute,
    candidate: &OptimizedRoute,
    position: usize,
    appointment: &Appointment,
    cluster_similar: bool,
) -> f64 {
    let cost = candidate.total_distance() - route.total_distance();
    if cluster_similar && position > 0 && route.appointment(position - 1).service_type == appointment.service_type {
        cost * SIMILAR_SERVICE_DISCOUNT
    } else {
        cost
    }
}

/// Insert every appointment at the route and position adding the least
/// distance.
pub fn nearest_neighbor(problem: &Problem) -> Solution {
    let ctx = &problem.context;
    let cluster_similar = problem.preferences.cluster_similar_services;
    let mut solution = problem.empty_solution();
    solution.unassigned.clear();

    for appointment in ordered_appointments(problem) {
        let mut best: Option<(usize, OptimizedRoute)> = None;
        let mut best_cost = f64::INFINITY;

        for (route_index, route) in solution.routes.iter().enumerate() {
            if !route.can_take(&appointment) {
                continue;
            }

            for position in 0..=route.len() {
                let candidate = route.with_inserted(position, appointment.clone(), ctx);
                if !candidate.is_feasible() {
                    continue;
                }
                let cost = insertion_cost(route, &candidate, position, &appointment, cluster_similar);
                if cost < best_cost {
                    best_cost = cost;
                    best = Some((route_index, candidate));
                }
            }
        }

        match best {
            Some((route_index, candidate)) => solution.routes[route_index] = candidate,
            None => solution.unassigned.push(appointment),
        }
    }

    solution
}

/// Group appointments around technicians with k-means, then route each group.
///
/// Centroids start at the technicians' start locations so cluster `i` belongs
/// to route `i`. Stops that do not fit their own technician are offered to
/// the other routes.
pub fn cluster_based(problem: &Problem) -> Solution {
    let ctx = &problem.context;
    let mut solution = problem.empty_solution();
    if solution.routes.is_empty() {
        return solution;
    }
    solution.unassigned.clear();

    let clusters = kmeans(problem);
    let mut overflow = Vec::new();

    for (route_index, members) in clusters.into_iter().enumerate() {
        let route = &mut solution.routes[route_index];
        let ordered = if problem.preferences.minimize_backtracking {
            nearest_neighbor_chain(route.technician().start_location(), members)
        } else {
            let mut members = members;
            members.sort_by_key(|appointment| appointment.scheduled_time);
            members
        };

        for appointment in ordered {
            if route.can_take(&appointment) {
                let candidate = route.with_inserted(route.len(), appointment.clone(), ctx);
                if candidate.is_feasible() {
                    *route = candidate;
                    continue;
                }
            }
            overflow.push(appointment);
        }
    }

    for appointment in overflow {
        if !append_closest(&mut solution, appointment.clone(), problem) {
            solution.unassigned.push(appointment);
        }
    }

    solution
}

fn kmeans(problem: &Problem) -> Vec<Vec<Arc<Appointment>>> {
    let mut centroids: Vec<Location> = problem
        .technicians
        .iter()
        .map(|technician| technician.start_location().clone())
        .collect();
    let mut assignment = vec![0usize; problem.appointments.len()];

    for _ in 0..KMEANS_ROUNDS {
        let mut changed = false;
        for (index, appointment) in problem.appointments.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    compare_f64(distance(a, &appointment.location), distance(b, &appointment.location))
                })
                .map_or(0, |(cluster, _)| cluster);
            if assignment[index] != nearest {
                assignment[index] = nearest;
                changed = true;
            }
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let (lat, lng, count) = problem
                .appointments
                .iter()
                .zip(&assignment)
                .filter(|(_, assigned)| **assigned == cluster)
                .fold((0.0, 0.0, 0usize), |(lat, lng, count), (appointment, _)| {
                    (lat + appointment.location.latitude, lng + appointment.location.longitude, count + 1)
                });
            if count > 0 {
                *centroid = Location::new(lat / count as f64, lng / count as f64);
            }
        }

        if !changed {
            break;
        }
    }

    let mut clusters = vec![Vec::new(); centroids.len()];
    for (appointment, cluster) in problem.appointments.iter().zip(assignment) {
        clusters[cluster].push(appointment.clone());
    }
    clusters
}

fn nearest_neighbor_chain(start: &Location, mut remaining: Vec<Arc<Appointment>>) -> Vec<Arc<Appointment>> {
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = start.clone();
    loop {
        let Some((index, _)) = remaining
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| compare_f64(distance(&current, &a.location), distance(&current, &b.location)))
        else {
            break;
        };
        let next = remaining.swap_remove(index);
        current = next.location.clone();
        ordered.push(next);
    }
    ordered
}

/// Append to the feasible route whose last stop is closest.
fn append_closest(solution: &mut Solution, appointment: Arc<Appointment>, problem: &Problem) -> bool {
    let ctx = &problem.context;
    let mut order: Vec<usize> = (0..solution.routes.len()).collect();
    order.sort_by(|&a, &b| {
        compare_f64(
            distance(last_location(&solution.routes[a]), &appointment.location),
            distance(last_location(&solution.routes[b]), &appointment.location),
        )
    });

    for route_index in order {
        let route = &solution.routes[route_index];
        if !route.can_take(&appointment) {
            continue;
        }
        let candidate = route.with_inserted(route.len(), appointment.clone(), ctx);
        if candidate.is_feasible() {
            solution.routes[route_index] = candidate;
            return true;
        }
    }
    false
}

/// Pack by urgency and requested time before geography.
///
/// Each appointment is appended to the route where it would start closest to
/// its requested time; ties go to the shorter added distance.
pub fn time_window(problem: &Problem) -> Solution {
    let ctx = &problem.context;
    let mut solution = problem.empty_solution();
    solution.unassigned.clear();

    let mut appointments = problem.appointments.clone();
    if problem.preferences.prioritize_urgent {
        appointments.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_time.time().cmp(&b.scheduled_time.time()))
        });
    } else {
        appointments.sort_by(|a, b| {
            a.scheduled_time
                .time()
                .cmp(&b.scheduled_time.time())
                .then(b.priority.cmp(&a.priority))
        });
    }

    for appointment in appointments {
        let mut best: Option<(usize, OptimizedRoute, f64, f64)> = None;

        for (route_index, route) in solution.routes.iter().enumerate() {
            if !route.can_take(&appointment) {
                continue;
            }
            let candidate = route.with_inserted(route.len(), appointment.clone(), ctx);
            if !candidate.is_feasible() {
                continue;
            }
            let lateness = candidate.stops().last().map_or(0.0, |stop| stop.lateness);
            let added = candidate.total_distance() - route.total_distance();
            let better = best.as_ref().is_none_or(|(_, _, best_lateness, best_added)| {
                lateness < *best_lateness || (lateness == *best_lateness && added < *best_added)
            });
            if better {
                best = Some((route_index, candidate, lateness, added));
            }
        }

        match best {
            Some((route_index, candidate, _, _)) => solution.routes[route_index] = candidate,
            None => solution.unassigned.push(appointment),
        }
    }

    solution
}

/// Shuffled appointments appended to randomly ordered routes.
pub fn random_solution(problem: &Problem, rng: &mut impl Rng) -> Solution {
    let ctx = &problem.context;
    let mut solution = problem.empty_solution();
    solution.unassigned.clear();

    let mut appointments = problem.appointments.clone();
    appointments.shuffle(rng);
    let mut route_order: Vec<usize> = (0..solution.routes.len()).collect();

    for appointment in appointments {
        route_order.shuffle(rng);
        let mut placed = false;
        for &route_index in &route_order {
            let route = &solution.routes[route_index];
            if !route.can_take(&appointment) {
                continue;
            }
            let candidate = route.with_inserted(route.len(), appointment.clone(), ctx);
            if candidate.is_feasible() {
                solution.routes[route_index] = candidate;
                placed = true;
                break;
            }
        }
        if !placed {
            solution.unassigned.push(appointment);
        }
    }

    solution
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::model::{Priority, Technician, TimeWindow, default_working_days};
    use crate::options::OptimizationOptions;

    fn appointment(id: &str, lat: f64, lng: f64, hour: u32, priority: Priority) -> Appointment {
        Appointment {
            id: id.into(),
            customer_id: id.into(),
            customer_name: id.into(),
            location: Location::new(lat, lng),
            scheduled_time: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            estimated_duration: 30.0,
            priority,
            service_type: "Annual Test".into(),
            required_skills: Vec::new(),
            preferences: None,
            enrichment: None,
        }
    }

    fn technician(id: &str, lat: f64, lng: f64, max_appointments: usize) -> Technician {
        Technician {
            id: id.into(),
            name: id.into(),
            skills: Vec::new(),
            home: Location::new(lat, lng),
            working_hours: TimeWindow::new(
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            ),
            working_days: default_working_days(),
            max_appointments,
            current_location: None,
        }
    }

    fn two_neighbourhoods() -> Problem {
        let mut appointments = Vec::new();
        for i in 0..4 {
            appointments.push(appointment(&format!("w{i}"), 36.10 + i as f64 * 0.002, -115.30, 8, Priority::Normal));
            appointments.push(appointment(&format!("e{i}"), 36.10 + i as f64 * 0.002, -115.00, 8, Priority::Normal));
        }
        let technicians = vec![technician("west", 36.10, -115.30, 10), technician("east", 36.10, -115.00, 10)];
        Problem::new(appointments, &technicians, &OptimizationOptions::default())
    }

    fn assert_conserved(solution: &Solution, problem: &Problem) {
        let mut ids = solution.appointment_ids();
        ids.sort();
        let mut expected: Vec<&str> = problem.appointments.iter().map(|a| a.id.as_str()).collect();
        expected.sort();
        assert_eq!(ids, expected);
        assert!(solution.is_feasible());
    }

    fn route_ids(route: &OptimizedRoute) -> Vec<&str> {
        route.appointments().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_nearest_neighbor_keeps_neighbourhoods_apart() {
        let problem = two_neighbourhoods();
        let solution = nearest_neighbor(&problem);
        assert_conserved(&solution, &problem);
        assert!(route_ids(&solution.routes[0]).iter().all(|id| id.starts_with('w')));
        assert!(route_ids(&solution.routes[1]).iter().all(|id| id.starts_with('e')));
    }

    #[test]
    fn test_cluster_based_assigns_clusters_to_nearby_technicians() {
        let problem = two_neighbourhoods();
        let solution = cluster_based(&problem);
        assert_conserved(&solution, &problem);
        assert_eq!(solution.routes[0].len(), 4);
        assert!(route_ids(&solution.routes[0]).iter().all(|id| id.starts_with('w')));
    }

    #[test]
    fn test_same_service_type_insertion_is_discounted() {
        let problem = Problem::new(
            vec![appointment("a", 36.10, -115.10, 9, Priority::Normal)],
            &[technician("t1", 36.10, -115.10, 5)],
            &OptimizationOptions::default(),
        );
        let ctx = &problem.context;
        let route = problem.empty_solution().routes[0].with_inserted(0, problem.appointments[0].clone(), ctx);

        let same = Arc::new(appointment("same", 36.12, -115.10, 11, Priority::Normal));
        let mut other = appointment("other", 36.12, -115.10, 11, Priority::Normal);
        other.service_type = "Repair & Retest".into();
        let other = Arc::new(other);

        let same_candidate = route.with_inserted(1, same.clone(), ctx);
        let other_candidate = route.with_inserted(1, other.clone(), ctx);
        let full = insertion_cost(&route, &other_candidate, 1, &other, true);
        assert!(full > 0.0);
        let discounted = insertion_cost(&route, &same_candidate, 1, &same, true);
        assert!((discounted - full * SIMILAR_SERVICE_DISCOUNT).abs() < 1e-9);
        assert!((insertion_cost(&route, &same_candidate, 1, &same, false) - full).abs() < 1e-9);
        // nothing precedes the first position
        let first = route.with_inserted(0, same.clone(), ctx);
        assert_eq!(
            insertion_cost(&route, &first, 0, &same, true),
            first.total_distance() - route.total_distance()
        );
    }

    #[test]
    fn test_cluster_order_follows_backtracking_preference() {
        let appointments = vec![
            appointment("far", 36.20, -115.10, 9, Priority::Normal),
            appointment("near", 36.11, -115.10, 13, Priority::Normal),
        ];
        let technicians = [technician("t1", 36.10, -115.10, 5)];
        let mut options = OptimizationOptions::default();

        options.preferences.minimize_backtracking = false;
        let by_time = Problem::new(appointments.clone(), &technicians, &options);
        let solution = cluster_based(&by_time);
        assert_conserved(&solution, &by_time);
        assert_eq!(route_ids(&solution.routes[0]), ["far", "near"]);

        options.preferences.minimize_backtracking = true;
        let by_distance = Problem::new(appointments, &technicians, &options);
        let solution = cluster_based(&by_distance);
        assert_conserved(&solution, &by_distance);
        assert_eq!(route_ids(&solution.routes[0]), ["near", "far"]);
    }

    #[test]
    fn test_time_window_places_urgent_first() {
        let appointments = vec![
            appointment("normal", 36.10, -115.10, 9, Priority::Normal),
            appointment("urgent", 36.10, -115.10, 9, Priority::Urgent),
        ];
        let technicians = vec![technician("t1", 36.10, -115.10, 1)];
        let problem = Problem::new(appointments, &technicians, &OptimizationOptions::default());
        let solution = time_window(&problem);
        assert_conserved(&solution, &problem);
        assert_eq!(route_ids(&solution.routes[0]), vec!["urgent"]);
        assert_eq!(solution.unassigned[0].id, "normal");
    }

    #[test]
    fn test_capacity_respected_by_every_constructor() {
        let appointments: Vec<Appointment> = (0..10)
            .map(|i| appointment(&format!("a{i}"), 36.10 + i as f64 * 0.001, -115.10, 8, Priority::Normal))
            .collect();
        let technicians = vec![technician("t1", 36.10, -115.10, 3)];
        let problem = Problem::new(appointments, &technicians, &OptimizationOptions::default());
        let mut rng = SmallRng::seed_from_u64(7);

        for solution in [
            nearest_neighbor(&problem),
            cluster_based(&problem),
            time_window(&problem),
            random_solution(&problem, &mut rng),
        ] {
            assert_conserved(&solution, &problem);
            assert_eq!(solution.routes[0].len(), 3);
            assert_eq!(solution.unassigned.len(), 7);
        }
    }

    #[test]
    fn test_no_technicians_leaves_everything_unassigned() {
        let appointments = vec![appointment("a", 36.1, -115.1, 9, Priority::Normal)];
        let problem = Problem::new(appointments, &[], &OptimizationOptions::default());
        let mut rng = SmallRng::seed_from_u64(1);
        for solution in [
            nearest_neighbor(&problem),
            cluster_based(&problem),
            time_window(&problem),
            random_solution(&problem, &mut rng),
        ] {
            assert!(solution.routes.is_empty());
            assert_eq!(solution.unassigned.len(), 1);
        }
    }

    #[test]
    fn test_skills_route_to_capable_technician() {
        let mut needs_skill = appointment("weld", 36.10, -115.10, 9, Priority::Normal);
        needs_skill.required_skills.push("welding".into());
        let mut skilled = technician("skilled", 36.50, -115.50, 5);
        skilled.skills.push("welding".into());
        let technicians = vec![technician("plain", 36.10, -115.10, 5), skilled];
        let problem = Problem::new(vec![needs_skill], &technicians, &OptimizationOptions::default());
        let solution = nearest_neighbor(&problem);
        assert!(solution.routes[0].is_empty());
        assert_eq!(solution.routes[1].len(), 1);
    }
}
