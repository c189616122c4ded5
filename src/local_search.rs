//! Hill-climbing refinement of a single solution.
//!
//! Every operator builds a candidate copy, scores it and either commits it or
//! drops it before the next move is tried. Routes recompute their aggregates
//! on every change.

use tracing::{debug, info};

use crate::fitness::score;
use crate::genetic::Individual;
use crate::route::OptimizedRoute;
use crate::solution::{Problem, Solution};

/// Minimum gain for a move to count as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

pub struct LocalSearch<'a> {
    problem: &'a Problem,
    max_iterations: usize,
}

impl<'a> LocalSearch<'a> {
    pub fn new(problem: &'a Problem, max_iterations: usize) -> Self {
        Self {
            problem,
            max_iterations,
        }
    }

    /// Run every operator until a full pass improves nothing or the
    /// iteration budget runs out. Never returns a worse score.
    pub fn refine(&self, solution: Solution) -> Individual {
        let mut current = Individual::new(solution, self.problem);
        let initial = current.score;
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let mut improved = false;

            improved |= self.swap_between_routes(&mut current);
            improved |= self.two_opt(&mut current);
            improved |= self.reassign(&mut current);
            improved |= self.insert_unassigned(&mut current);

            if !improved {
                break;
            }
        }

        info!(
            iterations,
            initial,
            score = current.score,
            unassigned = current.solution.unassigned.len(),
            "local search complete"
        );
        current
    }

    /// Replace the given routes and keep the result if it scores better.
    fn try_routes(&self, current: &mut Individual, changed: Vec<(usize, OptimizedRoute)>) -> bool {
        if changed.iter().any(|(_, route)| !route.is_feasible()) {
            return false;
        }
        let mut candidate = current.solution.clone();
        for (index, route) in changed {
            candidate.routes[index] = route;
        }
        self.commit_if_better(current, candidate)
    }

    fn commit_if_better(&self, current: &mut Individual, candidate: Solution) -> bool {
        let candidate_score = score(&candidate, &self.problem.objectives);
        if candidate_score > current.score + IMPROVEMENT_EPSILON {
            *current = Individual {
                solution: candidate,
                score: candidate_score,
            };
            true
        } else {
            false
        }
    }

    /// Exchange one appointment between every pair of routes.
    pub fn swap_between_routes(&self, current: &mut Individual) -> bool {
        let ctx = &self.problem.context;
        let route_count = current.solution.routes.len();
        let mut improved = false;

        for a in 0..route_count {
            for b in a + 1..route_count {
                for i in 0..current.solution.routes[a].len() {
                    for j in 0..current.solution.routes[b].len() {
                        let routes = &current.solution.routes;
                        let left = routes[a].appointment(i).clone();
                        let right = routes[b].appointment(j).clone();
                        if !routes[a].technician().can_serve(&right) || !routes[b].technician().can_serve(&left) {
                            continue;
                        }

                        let mut route_a = routes[a].clone();
                        let mut route_b = routes[b].clone();
                        route_a.replace(i, right, ctx);
                        route_b.replace(j, left, ctx);

                        if self.try_routes(current, vec![(a, route_a), (b, route_b)]) {
                            debug!(route_a = a, route_b = b, score = current.score, "swap accepted");
                            improved = true;
                        }
                    }
                }
            }
        }

        improved
    }

    /// Reverse every sub-segment of routes with at least four stops.
    pub fn two_opt(&self, current: &mut Individual) -> bool {
        let ctx = &self.problem.context;
        let mut improved = false;

        for r in 0..current.solution.routes.len() {
            let len = current.solution.routes[r].len();
            if len < 4 {
                continue;
            }
            for i in 0..len - 1 {
                for j in i + 1..len {
                    let mut route = current.solution.routes[r].clone();
                    route.reverse(i, j, ctx);
                    if self.try_routes(current, vec![(r, route)]) {
                        debug!(route = r, from = i, to = j, score = current.score, "2-opt accepted");
                        improved = true;
                    }
                }
            }
        }

        improved
    }

    /// Move each appointment into another route, taking the first move that
    /// improves the score.
    pub fn reassign(&self, current: &mut Individual) -> bool {
        let ctx = &self.problem.context;
        let mut improved = false;

        let ids: Vec<String> = current
            .solution
            .routes
            .iter()
            .flat_map(OptimizedRoute::appointments)
            .map(|appointment| appointment.id.clone())
            .collect();

        for id in ids {
            let Some((from, position)) = locate(&current.solution, &id) else {
                continue;
            };

            'targets: for to in 0..current.solution.routes.len() {
                if to == from {
                    continue;
                }
                let routes = &current.solution.routes;
                let appointment = routes[from].appointment(position).clone();
                if !routes[to].can_take(&appointment) {
                    continue;
                }

                let mut source = routes[from].clone();
                source.remove(position, ctx);
                let destination = routes[to].clone();
                for insert_at in 0..=destination.len() {
                    let target = destination.with_inserted(insert_at, appointment.clone(), ctx);
                    if self.try_routes(current, vec![(from, source.clone()), (to, target)]) {
                        debug!(appointment = %id, from, to, score = current.score, "reassign accepted");
                        improved = true;
                        break 'targets;
                    }
                }
            }
        }

        improved
    }

    /// Place each unassigned appointment at its best position, if that
    /// improves the score.
    pub fn insert_unassigned(&self, current: &mut Individual) -> bool {
        let ctx = &self.problem.context;
        let mut improved = false;

        let ids: Vec<String> = current
            .solution
            .unassigned
            .iter()
            .map(|appointment| appointment.id.clone())
            .collect();

        for id in ids {
            let Some(index) = current.solution.unassigned.iter().position(|a| a.id == id) else {
                continue;
            };
            let appointment = current.solution.unassigned[index].clone();

            let mut best: Option<(Solution, f64)> = None;
            for (r, route) in current.solution.routes.iter().enumerate() {
                if !route.can_take(&appointment) {
                    continue;
                }
                for insert_at in 0..=route.len() {
                    let target = route.with_inserted(insert_at, appointment.clone(), ctx);
                    if !target.is_feasible() {
                        continue;
                    }
                    let mut candidate = current.solution.clone();
                    candidate.routes[r] = target;
                    candidate.unassigned.remove(index);
                    let candidate_score = score(&candidate, &self.problem.objectives);
                    if best.as_ref().is_none_or(|(_, best_score)| candidate_score > *best_score) {
                        best = Some((candidate, candidate_score));
                    }
                }
            }

            if let Some((candidate, candidate_score)) = best {
                if candidate_score > current.score + IMPROVEMENT_EPSILON {
                    debug!(appointment = %id, score = candidate_score, "unassigned appointment inserted");
                    *current = Individual {
                        solution: candidate,
                        score: candidate_score,
                    };
                    improved = true;
                }
            }
        }

        improved
    }
}

fn locate(solution: &Solution, id: &str) -> Option<(usize, usize)> {
    solution.routes.iter().enumerate().find_map(|(r, route)| {
        route
            .appointments()
            .position(|appointment| appointment.id == id)
            .map(|position| (r, position))
    })
}
