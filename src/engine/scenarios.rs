use std::sync::mpsc::{Receiver, channel};

use chrono::Duration;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::*;
use crate::statistics::Breakeven;

const DELTA: f64 = 0.01;
const STARTING_FUNDS: f64 = 1000.0;
const POSITION_CAP: f64 = 150.0;
const STOP_LOSS: f64 = 20.0;
const CLOSING_PRICE: f64 = 35.0;

fn assert_close(expected: f64, actual: f64) {
    assert!((expected - actual).abs() < DELTA, "expected {expected}, got {actual}");
}

fn start() -> DateTime<Utc> {
    DateTime::default()
}

fn config() -> RunConfig {
    RunConfig::new(
        "User1",
        "GoldStrategy",
        "GOLD",
        (start(), start() + Duration::minutes(5)),
        STARTING_FUNDS,
        POSITION_CAP,
    )
    .unwrap()
}

fn new_run(config: &RunConfig) -> (Run, Receiver<Report>) {
    let (tx, rx) = channel();
    (Run::new(config, ReportId::new(1), tx), rx)
}

fn quote_at(price: f64, offset: Duration) -> Quote {
    Quote::new("GOLD", price, QuoteKind::Buy, start() + offset)
}

/// Inside the window.
fn inside(price: f64) -> Quote {
    quote_at(price, Duration::zero())
}

/// Past the window end.
fn past_end(price: f64) -> Quote {
    quote_at(price, Duration::hours(1))
}

#[derive(Default)]
struct Recorder {
    calls: usize,
}

impl Strategy for Recorder {
    fn execute(&mut self, _quote: &Quote, _run: &mut Run) -> Result<()> {
        self.calls += 1;
        Ok(())
    }
}

#[test]
fn identity_comes_from_config() {
    let (run, _rx) = new_run(&config());
    assert_eq!(run.identity(), &RunIdentity::new("User1", "GoldStrategy"));
    assert_ne!(run.identity(), &RunIdentity::new("User2", "GoldStrategy"));
    assert_eq!(run.asset(), "GOLD");
    assert_eq!(run.report_id(), ReportId::new(1));
}

#[test]
fn fresh_run() {
    let (run, rx) = new_run(&config());
    assert_eq!(run.state(), RunState::Active);
    assert!(!run.is_position_open());
    assert_eq!(run.cash(), STARTING_FUNDS);
    assert_eq!(run.reserved_funds(), 0.0);
    assert!(run.report().is_none());
    assert!(rx.try_recv().is_err());
}

#[test]
fn quote_inside_window_runs_strategy() {
    let (mut run, rx) = new_run(&config());
    let mut strategy = Recorder::default();

    let state = run.advance(&inside(12.3), &mut strategy).unwrap();
    assert_eq!(state, RunState::Active);
    assert_eq!(strategy.calls, 1);
    assert!(rx.try_recv().is_err());
}

#[test]
fn quote_at_window_end_is_still_inside() {
    let (mut run, rx) = new_run(&config());
    let mut strategy = Recorder::default();

    run.advance(&quote_at(12.3, Duration::minutes(5)), &mut strategy).unwrap();
    assert_eq!(strategy.calls, 1);
    assert!(!run.is_finished());
    assert!(rx.try_recv().is_err());
}

#[test]
fn quote_past_window_with_closed_position() {
    let (mut run, rx) = new_run(&config());
    let mut strategy = Recorder::default();

    let state = run.advance(&past_end(12.3), &mut strategy).unwrap();
    assert_eq!(state, RunState::Finished);
    assert_eq!(strategy.calls, 0);
    assert!(!run.is_position_open());

    let report = rx.try_recv().unwrap();
    assert_eq!(report.id, ReportId::new(1));
    assert_eq!(report.identity, RunIdentity::new("User1", "GoldStrategy"));
    assert_eq!(report.finished_at, start() + Duration::hours(1));
    assert!(!report.position_open);
    assert_eq!(run.report(), Some(&report));
    assert!(rx.try_recv().is_err());
}

#[test]
fn quote_past_window_leaves_position_open() {
    let (mut run, rx) = new_run(&config());
    let mut strategy = Recorder::default();

    run.open_position(52.0, 12.0).unwrap();
    assert!(run.is_position_open());

    run.advance(&past_end(12.3), &mut strategy).unwrap();
    assert_eq!(strategy.calls, 0);
    assert!(run.is_position_open());

    let report = rx.try_recv().unwrap();
    assert!(report.position_open);
    assert_close(12.0, report.reserved);
    assert_close(STARTING_FUNDS - POSITION_CAP - 12.0, report.cash);
    // 150 bought at 52, marked at 12.3
    assert_close(35.48, report.position_value.unwrap());
}

#[test]
fn quote_past_window_closes_position_when_asked() {
    let config = config().with_window_end_policy(WindowEndPolicy::CloseAtQuote);
    let (mut run, rx) = new_run(&config);
    let mut strategy = Recorder::default();

    run.open_position(12.3, STOP_LOSS).unwrap();
    run.advance(&past_end(CLOSING_PRICE), &mut strategy).unwrap();
    assert_eq!(strategy.calls, 0);
    assert!(!run.is_position_open());

    let report = rx.try_recv().unwrap();
    assert!(!report.position_open);
    assert_eq!(report.position_value, None);
    assert_eq!(report.reserved, 0.0);
    assert_close(1276.83, report.cash);
    assert_eq!(report.statistics.win_count(), 1);
}

#[test]
fn finished_run_is_never_reported_twice() {
    let (mut run, rx) = new_run(&config());
    let mut strategy = Recorder::default();

    run.advance(&past_end(12.3), &mut strategy).unwrap();
    let cash = run.cash();
    let statistics = run.statistics();

    for _ in 0..3 {
        let result = run.advance(&past_end(12.3), &mut strategy);
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }
    assert!(matches!(run.open_position(10.0, 1.0), Err(Error::InvalidState(_))));
    assert!(matches!(run.close_position(10.0), Err(Error::InvalidState(_))));

    assert_eq!(strategy.calls, 0);
    assert_eq!(run.cash(), cash);
    assert_eq!(run.statistics(), statistics);
    assert_eq!(rx.try_iter().count(), 1);
}

#[test]
fn out_of_order_quote_is_rejected() {
    let (mut run, _rx) = new_run(&config());
    let mut strategy = Recorder::default();

    run.advance(&quote_at(10.0, Duration::minutes(2)), &mut strategy).unwrap();
    let result = run.advance(&quote_at(10.0, Duration::minutes(1)), &mut strategy);
    assert!(matches!(result, Err(Error::QuoteOutOfOrder { .. })));
    assert_eq!(strategy.calls, 1);

    // same timestamp is fine
    run.advance(&quote_at(10.0, Duration::minutes(2)), &mut strategy).unwrap();
    assert_eq!(strategy.calls, 2);
}

#[test]
fn open_with_insufficient_funds_is_a_no_op() {
    let (mut run, _rx) = new_run(&config());

    run.open_position(12.3, STARTING_FUNDS + 200.0).unwrap();
    assert_eq!(run.cash(), STARTING_FUNDS);
    assert_eq!(run.reserved_funds(), 0.0);
    assert!(!run.is_position_open());
    assert_eq!(run.statistics().current_funds(), STARTING_FUNDS);
}

#[test]
fn open_reserves_and_invests() {
    let (mut run, _rx) = new_run(&config());

    run.open_position(12.3, STOP_LOSS).unwrap();
    assert!(run.is_position_open());
    assert_eq!(run.position().entry_price(), 12.3);
    assert_close(STOP_LOSS, run.reserved_funds());
    assert_close(830.0, run.cash());
    assert_close(850.0, run.statistics().current_funds());
    assert_close(POSITION_CAP, run.statistics().invested_funds());
}

#[test]
fn open_below_cap_invests_what_is_left() {
    let config = RunConfig::new(
        "User1",
        "GoldStrategy",
        "GOLD",
        (start(), start() + Duration::minutes(5)),
        100.0,
        POSITION_CAP,
    )
    .unwrap();
    let (mut run, _rx) = new_run(&config);

    run.open_position(10.0, 30.0).unwrap();
    assert_eq!(run.cash(), 0.0);
    assert_close(70.0, run.statistics().invested_funds());
}

#[test]
fn open_twice_fails_without_side_effects() {
    let (mut run, _rx) = new_run(&config());

    run.open_position(12.3, STOP_LOSS).unwrap();
    let cash = run.cash();

    let result = run.open_position(13.0, STOP_LOSS);
    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert_eq!(run.cash(), cash);
    assert_eq!(run.reserved_funds(), STOP_LOSS);
    assert_eq!(run.position().entry_price(), 12.3);
}

#[test]
fn open_while_open_fails_even_when_funds_are_short() {
    let (mut run, _rx) = new_run(&config());

    run.open_position(10.0, STOP_LOSS).unwrap();
    let cash = run.cash();

    let result = run.open_position(10.0, STARTING_FUNDS * 5.0);
    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert_eq!(run.cash(), cash);
    assert_eq!(run.reserved_funds(), STOP_LOSS);
    assert_close(POSITION_CAP, run.statistics().invested_funds());
}

#[test]
fn open_rejects_bad_inputs() {
    let (mut run, _rx) = new_run(&config());

    assert!(matches!(run.open_position(12.3, -1.0), Err(Error::InvalidAmount(_))));
    assert!(matches!(run.open_position(12.3, f64::NAN), Err(Error::InvalidAmount(_))));
    assert!(matches!(run.open_position(0.0, STOP_LOSS), Err(Error::InvalidPrice(_))));
    assert_eq!(run.cash(), STARTING_FUNDS);
    assert!(!run.is_position_open());
}

#[test]
fn close_updates_funds() {
    let (mut run, _rx) = new_run(&config());

    run.open_position(12.3, STOP_LOSS).unwrap();
    let proceeds = run.close_position(CLOSING_PRICE).unwrap();
    assert_close(426.83, proceeds);
    assert_close(1276.83, run.cash());
    assert_eq!(run.reserved_funds(), 0.0);
    assert!(!run.is_position_open());
    assert_close(1276.83, run.statistics().current_funds());
}

#[test]
fn breakeven_close_counts_as_win_when_configured() {
    let config = config().with_breakeven(Breakeven::Win);
    let (mut run, _rx) = new_run(&config);

    run.open_position(10.0, STOP_LOSS).unwrap();
    run.close_position(8.0).unwrap();
    assert_eq!(run.statistics().current_loss_streak(), 1);

    run.open_position(10.0, STOP_LOSS).unwrap();
    run.close_position(10.0).unwrap();

    let stats = run.statistics();
    assert_eq!(stats.win_count(), 1);
    assert_eq!(stats.loss_count(), 1);
    assert_eq!(stats.current_loss_streak(), 0);
    assert_close(STARTING_FUNDS - 30.0, run.cash());
}

#[test]
fn breakeven_close_is_neutral_by_default() {
    let (mut run, _rx) = new_run(&config());

    run.open_position(10.0, STOP_LOSS).unwrap();
    run.close_position(10.0).unwrap();

    let stats = run.statistics();
    assert_eq!(stats.win_count(), 0);
    assert_eq!(stats.loss_count(), 0);
    assert_close(STARTING_FUNDS, run.cash());
}

#[test]
fn close_without_position_fails() {
    let (mut run, _rx) = new_run(&config());
    assert!(matches!(run.close_position(CLOSING_PRICE), Err(Error::InvalidState(_))));
    assert_eq!(run.cash(), STARTING_FUNDS);
}

#[test]
fn closure_strategy_trades() {
    let (mut run, rx) = new_run(&config());

    let mut strategy = |quote: &Quote, run: &mut Run| -> Result<()> {
        if run.is_position_open() {
            run.close_position(quote.price())?;
        } else {
            run.open_position(quote.price(), STOP_LOSS)?;
        }
        Ok(())
    };

    let quotes = vec![
        quote_at(10.0, Duration::minutes(1)),
        quote_at(12.0, Duration::minutes(2)),
        quote_at(12.0, Duration::minutes(3)),
        quote_at(9.0, Duration::minutes(4)),
        quote_at(9.0, Duration::minutes(10)),
        quote_at(50.0, Duration::minutes(11)),
    ];
    let state = run.run(quotes, &mut strategy).unwrap();
    assert_eq!(state, RunState::Finished);

    let stats = run.statistics();
    assert_eq!(stats.win_count(), 1);
    assert_eq!(stats.loss_count(), 1);
    assert_close(30.0, stats.gross_profit());
    assert_close(37.5, stats.gross_loss());
    assert_close(992.5, run.cash());
    assert_eq!(rx.try_iter().count(), 1);
}

#[test]
fn run_stops_when_quotes_run_out() {
    let (mut run, rx) = new_run(&config());
    let mut strategy = Recorder::default();

    let state = run.run(vec![inside(10.0), inside(11.0)], &mut strategy).unwrap();
    assert_eq!(state, RunState::Active);
    assert_eq!(strategy.calls, 2);
    assert!(rx.try_recv().is_err());
}

#[derive(Debug)]
struct Boom;

impl std::fmt::Display for Boom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for Boom {}

#[test]
fn strategy_errors_propagate() {
    let (mut run, _rx) = new_run(&config());
    let mut strategy = |_: &Quote, _: &mut Run| -> Result<()> { Err(Error::strategy(Boom)) };

    let result = run.advance(&inside(10.0), &mut strategy);
    match result {
        Err(Error::Strategy(err)) => assert_eq!(err.to_string(), "boom"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!run.is_finished());
}

#[test]
fn failing_sink_is_called_once() {
    let (tx, rx) = channel::<Report>();
    drop(rx);
    let mut run = Run::new(&config(), ReportId::new(9), tx);
    let mut strategy = Recorder::default();

    let result = run.advance(&past_end(10.0), &mut strategy);
    assert!(matches!(result, Err(Error::Sink(_))));
    assert!(run.is_finished());
    assert!(run.report().is_some());
    assert!(matches!(run.advance(&past_end(10.0), &mut strategy), Err(Error::InvalidState(_))));
}

#[test]
fn vec_sink_can_be_used() {
    let mut run = Run::new(&config(), ReportId::random(), Vec::<Report>::new());
    let mut strategy = Recorder::default();
    run.advance(&past_end(10.0), &mut strategy).unwrap();
    assert_eq!(run.report().map(|r| r.id), Some(run.report_id()));
}

#[test]
fn custom_drawdown_return_policy() {
    #[derive(Debug)]
    struct Constant;

    impl DrawdownReturnPolicy for Constant {
        fn evaluate(&self, _previous: f64, _stats: &Statistics) -> f64 {
            42.0
        }
    }

    let (run, _rx) = new_run(&config());
    let mut run = run.with_drawdown_return_policy(Arc::new(Constant));
    run.open_position(10.0, STOP_LOSS).unwrap();
    run.close_position(11.0).unwrap();
    assert_eq!(run.statistics().drawdown_return(), 42.0);
}

#[test]
fn random_trading_keeps_invariants() {
    let mut rng = StdRng::seed_from_u64(42);
    let (mut run, _rx) = new_run(&config());

    let mut peak = run.statistics().peak_funds();
    let mut max_drawdown = 0.0;
    let mut max_streak = 0;

    for _ in 0..2_000 {
        let price = rng.random_range(1.0..100.0);
        if run.is_position_open() && rng.random_bool(0.5) {
            run.close_position(price).unwrap();
            assert!(!run.is_position_open());
            assert_eq!(run.reserved_funds(), 0.0);

            let stats = run.statistics();
            assert!(stats.peak_funds() >= peak);
            assert!(stats.max_drawdown() >= max_drawdown);
            assert!(stats.max_loss_streak() >= max_streak);
            peak = stats.peak_funds();
            max_drawdown = stats.max_drawdown();
            max_streak = stats.max_loss_streak();
        } else if !run.is_position_open() {
            let reserve = rng.random_range(0.0..run.cash() * 1.5 + 1.0);
            let cash = run.cash();
            run.open_position(price, reserve).unwrap();
            if reserve > cash {
                assert!(!run.is_position_open());
                assert_eq!(run.cash(), cash);
            } else {
                assert!(run.is_position_open());
            }
        }
        assert!(run.cash() >= 0.0);
    }
}
