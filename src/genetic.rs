//! Genetic search over whole solutions.
//!
//! Individuals are complete solutions. Each generation keeps the better half
//! as parents, breeds children by route-slot crossover and optional mutation,
//! repairs them and scores the new population in parallel.

use std::time::{Duration, Instant};

use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::construct::random_solution;
use crate::fitness::score;
use crate::options::GeneticParams;
use crate::solution::{Problem, Solution};

#[derive(Debug, Clone)]
pub struct Individual {
    pub solution: Solution,
    pub score: f64,
}

impl Individual {
    pub fn new(solution: Solution, problem: &Problem) -> Self {
        let score = score(&solution, &problem.objectives);
        Self { solution, score }
    }
}

pub struct GeneticOptimizer<'a> {
    problem: &'a Problem,
    params: GeneticParams,
    deadline: Option<Duration>,
}

impl<'a> GeneticOptimizer<'a> {
    pub fn new(problem: &'a Problem, params: GeneticParams) -> Self {
        Self {
            problem,
            params,
            deadline: None,
        }
    }

    /// Stop evolving once `deadline` has elapsed, keeping the best so far.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Evolve from `seeds`, padded with random solutions to the population
    /// size, and return the best individual found.
    pub fn evolve(&self, seeds: Vec<Solution>, rng: &mut impl Rng) -> Individual {
        let started = Instant::now();
        let size = self.params.population_size.max(1);

        let mut population = seeds;
        while population.len() < size {
            population.push(random_solution(self.problem, rng));
        }
        let mut scored = self.evaluate(population);
        sort_descending(&mut scored);
        scored.truncate(size);

        let mut generations_run = 0;
        for generation in 0..self.params.generations {
            if self.deadline.is_some_and(|deadline| started.elapsed() >= deadline) {
                warn!(generation, "genetic deadline reached, returning best so far");
                break;
            }

            let parent_count = (scored.len() / 2).max(1);
            scored.truncate(parent_count);

            let mut children = Vec::with_capacity(size.saturating_sub(parent_count));
            while parent_count + children.len() < size {
                let first = self.tournament(&scored, rng);
                let second = self.tournament(&scored, rng);
                let mut child = crossover(&first.solution, &second.solution, rng);
                child.repair(self.problem);
                if rng.random_bool(self.params.mutation_rate.clamp(0.0, 1.0)) {
                    self.mutate(&mut child, rng);
                }
                children.push(child);
            }

            scored.extend(self.evaluate(children));
            sort_descending(&mut scored);
            generations_run = generation + 1;
            debug!(generation, best = scored[0].score, "generation complete");
        }

        let best = scored
            .into_iter()
            .next()
            .unwrap_or_else(|| Individual::new(self.problem.empty_solution(), self.problem));
        info!(generations = generations_run, score = best.score, "genetic search complete");
        best
    }

    fn evaluate(&self, solutions: Vec<Solution>) -> Vec<Individual> {
        solutions
            .into_par_iter()
            .map(|solution| Individual::new(solution, self.problem))
            .collect()
    }

    /// Best of `tournament_size` individuals drawn with replacement.
    fn tournament<'p>(&self, parents: &'p [Individual], rng: &mut impl Rng) -> &'p Individual {
        let mut best = &parents[rng.random_range(0..parents.len())];
        for _ in 1..self.params.tournament_size.max(1) {
            let challenger = &parents[rng.random_range(0..parents.len())];
            if challenger.score > best.score {
                best = challenger;
            }
        }
        best
    }

    /// Apply one random operator; an infeasible result is discarded.
    pub fn mutate(&self, solution: &mut Solution, rng: &mut impl Rng) {
        let ctx = &self.problem.context;
        let mut mutated = solution.clone();
        let routes = &mut mutated.routes;

        let applied = match rng.random_range(0..3) {
            0 => {
                let filled: Vec<usize> = (0..routes.len()).filter(|&i| !routes[i].is_empty()).collect();
                if filled.len() < 2 {
                    false
                } else {
                    let a = filled[rng.random_range(0..filled.len())];
                    let mut b = filled[rng.random_range(0..filled.len())];
                    while b == a {
                        b = filled[rng.random_range(0..filled.len())];
                    }
                    let i = rng.random_range(0..routes[a].len());
                    let j = rng.random_range(0..routes[b].len());
                    let moving = routes[a].appointment(i).clone();
                    let displaced = routes[b].replace(j, moving, ctx);
                    routes[a].replace(i, displaced, ctx);
                    true
                }
            }
            1 => {
                let long: Vec<usize> = (0..routes.len()).filter(|&i| routes[i].len() >= 2).collect();
                if long.is_empty() {
                    false
                } else {
                    let r = long[rng.random_range(0..long.len())];
                    let from = rng.random_range(0..routes[r].len() - 1);
                    let to = rng.random_range(from + 1..routes[r].len());
                    routes[r].reverse(from, to, ctx);
                    true
                }
            }
            _ => {
                let filled: Vec<usize> = (0..routes.len()).filter(|&i| !routes[i].is_empty()).collect();
                if filled.is_empty() {
                    false
                } else {
                    let from = filled[rng.random_range(0..filled.len())];
                    let position = rng.random_range(0..routes[from].len());
                    let moving = routes[from].remove(position, ctx);
                    let to = rng.random_range(0..routes.len());
                    let insert_at = rng.random_range(0..=routes[to].len());
                    routes[to].insert(insert_at, moving, ctx);
                    true
                }
            }
        };

        if applied && mutated.is_feasible() {
            *solution = mutated;
        }
    }
}

fn sort_descending(individuals: &mut [Individual]) {
    individuals.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Take each route slot from one parent. Slots hold the same technician in
/// every solution, so whole routes stay feasible; the caller repairs
/// duplicates and losses.
pub fn crossover(first: &Solution, second: &Solution, rng: &mut impl Rng) -> Solution {
    let slots = first.routes.len().max(second.routes.len());
    let routes = (0..slots)
        .filter_map(|slot| match (first.routes.get(slot), second.routes.get(slot)) {
            (Some(a), Some(b)) => Some(if rng.random_bool(0.5) { a.clone() } else { b.clone() }),
            (Some(a), None) => Some(a.clone()),
            (None, Some(b)) => Some(b.clone()),
            (None, None) => None,
        })
        .collect();

    Solution {
        routes,
        unassigned: Vec::new(),
    }
}
