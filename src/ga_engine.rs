
use crate::data_types::errors::HicError;
use crate::genome::Genome;
use crate::operators::{MultiMutator, Selector, TournamentSelector, random_cut_points, score_key};

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use simple_error::bail;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Instant;
use threadpool::ThreadPool;

/// Tunable parameters of one optimizer run
#[derive(Clone, Debug, PartialEq)]
pub struct GaParameters {
    /// Number of individuals kept after each generation
    pub population_size: usize,
    /// Chance per population slot of breeding two tournament-selected parents
    pub breed_probability: f64,
    /// Chance per population slot of adding a mutated copy of that slot
    pub mutate_probability: f64,
    /// Number of contestants sampled per tournament
    pub tournament_size: usize,
    /// Chance of accepting each ranked tournament contestant in turn
    pub elite_probability: f64,
    /// Worker threads for fitness evaluation, 1 evaluates inline
    pub threads: usize,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>
}

impl GaParameters {
    pub fn scaffolding_defaults() -> GaParameters {
        GaParameters {
            population_size: 40,
            breed_probability: 0.2,
            mutate_probability: 0.6,
            tournament_size: 5,
            elite_probability: 0.7,
            threads: 1,
            seed: None
        }
    }

    pub fn phasing_defaults() -> GaParameters {
        GaParameters {
            population_size: 10,
            breed_probability: 0.7,
            mutate_probability: 0.7,
            ..GaParameters::scaffolding_defaults()
        }
    }

    /// # Errors
    /// * if the population is smaller than 2
    /// * if either probability is outside [0, 1]
    /// * if threads is 0
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.population_size < 2 {
            bail!("population size must be at least 2, found {}", self.population_size);
        }
        for (label, value) in [("breed", self.breed_probability), ("mutate", self.mutate_probability)] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} probability must be in [0, 1], found {}", label, value);
            }
        }
        if self.threads == 0 {
            bail!("at least one thread is required");
        }
        Ok(())
    }
}

/// Lifecycle of an optimizer run
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum EngineState {
    /// Constructed, no population yet
    Created,
    /// Population built and scored
    Initialized,
    /// At least one generation completed
    Evolving,
    /// Best solution handed out, no further generations allowed
    Terminated
}

/// Counters collected over one optimizer run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStatistics {
    pub generations: usize,
    pub score_evaluations: u64,
    pub breed_events: u64,
    pub mutation_events: u64,
    pub mutator_usage: Vec<(String, u64)>,
    pub wall_seconds: f64,
    pub cpu_seconds: f64
}

impl RunStatistics {
    pub fn log_summary(&self) {
        info!("Optimization statistics:");
        info!("\tGenerations: {}", self.generations);
        info!("\tScore evaluations: {}", self.score_evaluations);
        info!("\tBreeding events: {}", self.breed_events);
        info!("\tMutation events: {}", self.mutation_events);
        for (name, count) in self.mutator_usage.iter() {
            info!("\t\t{name}: {count}");
        }
        info!("\tWall time: {:.3} s, CPU time: {:.3} s", self.wall_seconds, self.cpu_seconds);
    }
}

/// Population-based minimizer over any `Genome`.
/// Each generation walks the population slots; per slot it may breed two tournament winners
/// and may add a mutated copy of the slot. New children are scored (in parallel when configured),
/// merged with the population, and the best `population_size` survive.
pub struct GeneticAlgorithm<G: Genome> {
    parameters: GaParameters,
    mutator: MultiMutator<G>,
    selector: Box<dyn Selector<G>>,
    rng: StdRng,
    /// Present only when more than one thread is requested
    pool: Option<ThreadPool>,
    population: Vec<G>,
    /// Best individual ever observed, kept apart from the population
    best: Option<G>,
    state: EngineState,
    generation: usize,
    score_evaluations: Arc<AtomicU64>,
    breed_events: u64,
    mutation_events: u64
}

impl<G: Genome> GeneticAlgorithm<G> {
    /// Creates an engine with an explicit selection strategy.
    /// # Errors
    /// * if `parameters` fail validation
    pub fn with_selector(parameters: GaParameters, mutator: MultiMutator<G>, selector: Box<dyn Selector<G>>) -> Result<GeneticAlgorithm<G>, Box<dyn std::error::Error>> {
        parameters.validate()?;
        let rng: StdRng = match parameters.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy()
        };
        let pool: Option<ThreadPool> = if parameters.threads > 1 {
            Some(ThreadPool::new(parameters.threads))
        } else {
            None
        };
        Ok(GeneticAlgorithm {
            parameters,
            mutator,
            selector,
            rng,
            pool,
            population: vec![],
            best: None,
            state: EngineState::Created,
            generation: 0,
            score_evaluations: Arc::new(AtomicU64::new(0)),
            breed_events: 0,
            mutation_events: 0
        })
    }

    /// Creates an engine using tournament selection from the parameters.
    /// # Errors
    /// * if `parameters` fail validation
    pub fn new(parameters: GaParameters, mutator: MultiMutator<G>) -> Result<GeneticAlgorithm<G>, Box<dyn std::error::Error>> {
        let selector = TournamentSelector::new(parameters.tournament_size, parameters.elite_probability)?;
        GeneticAlgorithm::with_selector(parameters, mutator, Box::new(selector))
    }

    /// Builds the first population from randomized clones of `template` and scores it.
    /// # Errors
    /// * `EmptyResult` if the template has no genes, i.e. the link store is empty
    /// * if the engine was already initialized
    /// * if parallel evaluation fails
    pub fn initialize(&mut self, template: &G) -> Result<(), Box<dyn std::error::Error>> {
        if self.state != EngineState::Created {
            bail!("optimizer is already {}", self.state);
        }
        if template.is_empty() {
            return Err(HicError::empty("cannot optimize against an empty link store").into());
        }

        let mut initial: Vec<G> = Vec::with_capacity(self.parameters.population_size);
        for _ in 0..self.parameters.population_size {
            let mut genome: G = template.clone();
            genome.randomize(&mut self.rng);
            initial.push(genome);
        }
        self.population = self.evaluate(initial)?;
        self.rank_population();
        self.state = EngineState::Initialized;
        debug!("Initialized population of {} with best score {:?}", self.population.len(), self.best_score());
        Ok(())
    }

    /// Scores every genome without a cached score, returning them in the same order.
    /// All work for the batch completes before this returns.
    fn evaluate(&self, mut genomes: Vec<G>) -> Result<Vec<G>, Box<dyn std::error::Error>> {
        let pool: &ThreadPool = match self.pool.as_ref() {
            Some(p) => p,
            None => {
                for genome in genomes.iter_mut().filter(|g| g.cached_score().is_none()) {
                    genome.score();
                    self.score_evaluations.fetch_add(1, Ordering::Relaxed);
                }
                return Ok(genomes);
            }
        };

        let (tx, rx) = mpsc::channel();
        let mut results: Vec<Option<G>> = Vec::with_capacity(genomes.len());
        let mut jobs_queued: usize = 0;
        for (index, mut genome) in genomes.drain(..).enumerate() {
            if genome.cached_score().is_some() {
                results.push(Some(genome));
                continue;
            }
            results.push(None);
            let tx = tx.clone();
            let counter = Arc::clone(&self.score_evaluations);
            pool.execute(move || {
                genome.score();
                counter.fetch_add(1, Ordering::Relaxed);
                tx.send((index, genome)).expect("channel will be there waiting for the pool");
            });
            jobs_queued += 1;
        }
        drop(tx);

        for _ in 0..jobs_queued {
            let (index, genome) = rx.recv()?;
            results[index] = Some(genome);
        }
        if pool.panic_count() > 0 {
            bail!("panic detected in fitness evaluation pool");
        }
        match results.into_iter().collect::<Option<Vec<G>>>() {
            Some(scored) => Ok(scored),
            None => bail!("fitness evaluation lost an individual")
        }
    }

    /// Sorts best first and refreshes the best-so-far slot
    fn rank_population(&mut self) {
        self.population.sort_by(|a, b| score_key(a).total_cmp(&score_key(b)));
        if let Some(leader) = self.population.first() {
            let improved: bool = match self.best.as_ref() {
                Some(best) => score_key(leader) < score_key(best),
                None => true
            };
            if improved {
                self.best = Some(leader.clone());
            }
        }
    }

    /// Runs one generation.
    /// # Errors
    /// * if the engine is not initialized or already terminated
    /// * if parallel evaluation fails
    pub fn evolve(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        match self.state {
            EngineState::Created => bail!("optimizer must be initialized before evolving"),
            EngineState::Terminated => bail!("optimizer has already terminated"),
            EngineState::Initialized | EngineState::Evolving => {}
        };

        let mut children: Vec<G> = vec![];
        for slot in 0..self.population.len() {
            if self.rng.gen::<f64>() < self.parameters.breed_probability {
                let parent_a: &G = self.selector.select(&self.population, &mut self.rng);
                let parent_b: &G = self.selector.select(&self.population, &mut self.rng);
                let (p1, p2) = random_cut_points(parent_a.len(), &mut self.rng);
                let (child_a, child_b) = parent_a.crossover(parent_b, p1, p2);
                children.push(child_a);
                children.push(child_b);
                self.breed_events += 1;
            }
            if self.rng.gen::<f64>() < self.parameters.mutate_probability {
                let mutant: G = self.mutator.mutate(&self.population[slot], &mut self.rng);
                children.push(mutant);
                self.mutation_events += 1;
            }
        }

        let mut scored: Vec<G> = self.evaluate(children)?;
        self.population.append(&mut scored);
        self.rank_population();
        self.population.truncate(self.parameters.population_size);
        self.generation += 1;
        self.state = EngineState::Evolving;
        Ok(())
    }

    /// Ends the run and returns the best individual observed.
    /// # Errors
    /// * if the engine was never initialized
    pub fn finish(&mut self) -> Result<G, Box<dyn std::error::Error>> {
        match self.best.clone() {
            Some(best) => {
                self.state = EngineState::Terminated;
                Ok(best)
            },
            None => bail!("optimizer finished without a population")
        }
    }

    pub fn best(&self) -> Option<&G> {
        self.best.as_ref()
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().and_then(|b| b.cached_score())
    }

    pub fn population(&self) -> &[G] {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Counters so far; timing fields are left for the caller to fill
    pub fn statistics(&self) -> RunStatistics {
        RunStatistics {
            generations: self.generation,
            score_evaluations: self.score_evaluations.load(Ordering::Relaxed),
            breed_events: self.breed_events,
            mutation_events: self.mutation_events,
            mutator_usage: self.mutator.usage(),
            ..Default::default()
        }
    }
}

/// Best solution captured partway through a run
#[derive(Clone, Debug)]
pub struct Snapshot<S> {
    pub iteration: usize,
    pub score: f64,
    pub solution: S
}

/// Everything produced by `optimize`
#[derive(Debug)]
pub struct OptimizationResult<G, S> {
    pub best: G,
    pub score: f64,
    pub solution: S,
    pub snapshots: Vec<Snapshot<S>>,
    pub statistics: RunStatistics
}

/// Generations between snapshots: `floor(iterations * report_frequency) + 1`
pub fn report_interval(iterations: usize, report_frequency: f64) -> usize {
    (iterations as f64 * report_frequency).floor() as usize + 1
}

/// Drives a full run: initialize from `template`, evolve for exactly `iterations` generations,
/// and decode the best individual every `report_interval` generations and at the end.
/// Snapshots only read the best-so-far slot.
/// # Arguments
/// * `engine` - a freshly created engine
/// * `template` - the genome cloned and randomized into the first population
/// * `iterations` - the generation budget
/// * `report_frequency` - fraction of the budget between snapshots
/// * `decode` - converts a genome into its reported solution
/// # Errors
/// * `EmptyResult` if the template is empty
/// * anything raised by evolution or decoding
pub fn optimize<G, S, F>(
    engine: &mut GeneticAlgorithm<G>, template: &G, iterations: usize, report_frequency: f64, decode: F
) -> Result<OptimizationResult<G, S>, Box<dyn std::error::Error>>
where
    G: Genome,
    S: Clone,
    F: Fn(&G) -> Result<S, HicError>
{
    let start_time: Instant = Instant::now();
    let cpu_start = cpu_time::ProcessTime::now();
    engine.initialize(template)?;

    let interval: usize = report_interval(iterations, report_frequency);
    info!("Optimizing {} genes for {} generations, snapshot every {} generations...", template.len(), iterations, interval);

    let mut snapshots: Vec<Snapshot<S>> = vec![];
    for iteration in 1..=iterations {
        engine.evolve()?;
        if iteration % interval == 0 || iteration == iterations {
            let best: &G = match engine.best() {
                Some(b) => b,
                None => bail!("no best individual after generation {}", iteration)
            };
            let score: f64 = score_key(best);
            debug!("Snapshot at generation {}: score {:.4}", iteration, score);
            snapshots.push(Snapshot {
                iteration,
                score,
                solution: decode(best)?
            });
            info!("Generation {}/{}: best score {:.4}", iteration, iterations, score);
        }
    }

    let best: G = engine.finish()?;
    let score: f64 = score_key(&best);
    let solution: S = decode(&best)?;
    let mut statistics: RunStatistics = engine.statistics();
    statistics.wall_seconds = start_time.elapsed().as_secs_f64();
    statistics.cpu_seconds = cpu_start.elapsed().as_secs_f64();
    info!("Optimization finished with best score {:.4}", score);

    Ok(OptimizationResult {
        best,
        score,
        solution,
        snapshots,
        statistics
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstring_genome::BitstringGenome;
    use crate::data_types::links::LinkStore;
    use crate::operators::MutationKind;
    use crate::ordered_genome::OrderedGenome;
    use crate::scoring::{phase_score, scaffold_score};

    fn chain_links(size: usize) -> Arc<LinkStore> {
        let mut links = LinkStore::new();
        let ids: Vec<usize> = (0..size).map(|i| links.id(&format!("ctg_{i}"))).collect();
        for w in ids.windows(2) {
            links.set(w[0], w[1], 1.0).unwrap();
        }
        Arc::new(links)
    }

    fn scaffold_engine(seed: u64, threads: usize) -> GeneticAlgorithm<OrderedGenome> {
        let parameters = GaParameters {
            population_size: 20,
            threads,
            seed: Some(seed),
            ..GaParameters::scaffolding_defaults()
        };
        let mutator = MultiMutator::from_kinds(&[MutationKind::Invert, MutationKind::Switch, MutationKind::Shift]).unwrap();
        GeneticAlgorithm::new(parameters, mutator).unwrap()
    }

    #[test]
    fn test_report_interval() {
        assert_eq!(report_interval(100, 0.1), 11);
        assert_eq!(report_interval(10, 0.0), 1);
        assert_eq!(report_interval(5, 1.0), 6);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(GaParameters::scaffolding_defaults().validate().is_ok());
        assert!(GaParameters::phasing_defaults().validate().is_ok());
        let bad_population = GaParameters { population_size: 1, ..GaParameters::scaffolding_defaults() };
        assert!(bad_population.validate().is_err());
        let bad_probability = GaParameters { mutate_probability: 1.2, ..GaParameters::scaffolding_defaults() };
        assert!(bad_probability.validate().is_err());
        let bad_threads = GaParameters { threads: 0, ..GaParameters::scaffolding_defaults() };
        assert!(bad_threads.validate().is_err());
    }

    #[test]
    fn test_empty_links_rejected() {
        let mut engine = scaffold_engine(0, 1);
        let template = OrderedGenome::new(Arc::new(LinkStore::new()), scaffold_score);
        let error = engine.initialize(&template).unwrap_err();
        assert!(matches!(error.downcast_ref::<HicError>(), Some(HicError::EmptyResult { .. })));
        assert_eq!(engine.state(), EngineState::Created);
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = scaffold_engine(0, 1);
        assert!(engine.evolve().is_err());
        assert!(engine.finish().is_err());

        let template = OrderedGenome::new(chain_links(5), scaffold_score);
        engine.initialize(&template).unwrap();
        assert_eq!(engine.state(), EngineState::Initialized);
        assert!(engine.initialize(&template).is_err());

        engine.evolve().unwrap();
        assert_eq!(engine.state(), EngineState::Evolving);
        assert_eq!(engine.generation(), 1);

        engine.finish().unwrap();
        assert_eq!(engine.state(), EngineState::Terminated);
        assert!(engine.evolve().is_err());
    }

    #[test]
    fn test_best_is_monotonic() {
        let mut engine = scaffold_engine(42, 1);
        let template = OrderedGenome::new(chain_links(12), scaffold_score);
        engine.initialize(&template).unwrap();
        let mut previous: f64 = engine.best_score().unwrap();
        for _ in 0..30 {
            engine.evolve().unwrap();
            let current: f64 = engine.best_score().unwrap();
            assert!(current <= previous);
            previous = current;

            assert_eq!(engine.population().len(), 20);
            assert!(engine.population().iter().all(|g| g.is_valid() && g.cached_score().is_some()));
            let first = engine.population()[0].cached_score().unwrap();
            assert!(engine.population().iter().all(|g| g.cached_score().unwrap() >= first));
        }
        let statistics = engine.statistics();
        assert_eq!(statistics.generations, 30);
        assert!(statistics.score_evaluations >= 20);
        let used: u64 = statistics.mutator_usage.iter().map(|(_, c)| c).sum();
        assert_eq!(used, statistics.mutation_events);
    }

    #[test]
    fn test_threads_do_not_change_trajectory() {
        let template = OrderedGenome::new(chain_links(10), scaffold_score);
        let mut serial = scaffold_engine(7, 1);
        let mut parallel = scaffold_engine(7, 4);
        serial.initialize(&template).unwrap();
        parallel.initialize(&template).unwrap();
        for _ in 0..15 {
            serial.evolve().unwrap();
            parallel.evolve().unwrap();
        }
        assert_eq!(serial.best().unwrap().genes(), parallel.best().unwrap().genes());
        assert_eq!(serial.statistics().score_evaluations, parallel.statistics().score_evaluations);
    }

    #[test]
    fn test_report_frequency_does_not_change_trajectory() {
        let template = OrderedGenome::new(chain_links(12), scaffold_score);
        let mut dense = scaffold_engine(11, 2);
        let mut sparse = scaffold_engine(11, 2);
        let every = optimize(&mut dense, &template, 40, 0.0, |g: &OrderedGenome| g.decode()).unwrap();
        let once = optimize(&mut sparse, &template, 40, 1.0, |g: &OrderedGenome| g.decode()).unwrap();

        assert_eq!(every.snapshots.len(), 40);
        assert_eq!(once.snapshots.len(), 1);
        assert_eq!(every.best.genes(), once.best.genes());
        assert_eq!(every.score, once.score);
        assert_eq!(every.statistics.score_evaluations, once.statistics.score_evaluations);
        assert_eq!(every.statistics.mutation_events, once.statistics.mutation_events);
    }

    #[test]
    fn test_optimize_small_scaffold() {
        let template = OrderedGenome::new(chain_links(4), scaffold_score);
        let mut engine = scaffold_engine(0, 2);
        let result = optimize(&mut engine, &template, 100, 0.2, |g: &OrderedGenome| g.decode()).unwrap();

        // the chain order (either direction) is the unique optimum
        assert!((result.score + 5.0).abs() < 1e-9);
        let forward: Vec<String> = (0..4).map(|i| format!("ctg_{i}")).collect();
        let mut reverse = forward.clone();
        reverse.reverse();
        assert!(result.solution == forward || result.solution == reverse);

        let iterations: Vec<usize> = result.snapshots.iter().map(|s| s.iteration).collect();
        assert_eq!(iterations, vec![21, 42, 63, 84, 100]);
        assert!(result.snapshots.windows(2).all(|w| w[1].score <= w[0].score));
        assert_eq!(result.statistics.generations, 100);
        assert_eq!(engine.state(), EngineState::Terminated);
    }

    #[test]
    fn test_optimize_small_phasing() {
        let mut links = LinkStore::new();
        for name in ["chr1_1", "chr1_2", "chr1_3"] {
            links.id(name);
        }
        links.set(0, 1, 2.0).unwrap();
        links.set(1, 2, -1.0).unwrap();
        let template = BitstringGenome::new(Arc::new(links), phase_score);

        let parameters = GaParameters { seed: Some(3), ..GaParameters::phasing_defaults() };
        let mutator = MultiMutator::from_kinds(&[MutationKind::Invert, MutationKind::Switch]).unwrap();
        let mut engine = GeneticAlgorithm::new(parameters, mutator).unwrap();
        let result = optimize(&mut engine, &template, 50, 0.5, |g: &BitstringGenome| g.decode()).unwrap();

        assert!((result.score + 4.0).abs() < 1e-9);
        assert_eq!(result.solution["chr1_1"], result.solution["chr1_2"]);
        assert_ne!(result.solution["chr1_2"], result.solution["chr1_3"]);
        assert_eq!(result.snapshots.len(), 2);
    }
}
