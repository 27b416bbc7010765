use chrono::{DateTime, Duration, TimeZone, Utc};
use om_core::*;
use speculate2::speculate;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 6, 30, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

fn guided(minutes: u32) -> SessionConfig {
    SessionConfig::from_keys("sage_arjun", Intent::StressRelief, None, minutes)
        .expect("Failed to build config")
}

speculate! {
    before {
        let mut controller = PhaseController::new();
    }

    describe "thresholds" {
        it "are quarters of the session for every allowed duration" {
            for minutes in MIN_MINUTES..=MAX_MINUTES {
                controller.start(guided(minutes), t0());
                let total = u64::from(minutes) * 60;
                let thresholds = controller.schedule().unwrap().thresholds();
                assert_eq!(thresholds, [total / 4, total / 2, total * 3 / 4]);
                assert!(thresholds[0] < thresholds[1] && thresholds[1] < thresholds[2]);
            }
        }

        it "advances to phase 1 exactly once at 151 seconds of a ten minute session" {
            controller.start(guided(10), t0());
            assert_eq!(controller.tick(at(149)), TickOutcome::Waiting { elapsed: 149 });

            let outcome = controller.tick(at(151));
            assert!(matches!(outcome, TickOutcome::Advanced { entry, elapsed: 151 } if entry.index == 1));
            assert_eq!(controller.tick(at(152)), TickOutcome::Waiting { elapsed: 152 });
            assert_eq!(controller.state(), ControllerState::Running(1));
        }
    }

    describe "start" {
        it "resets a running session to phase 0" {
            controller.start(guided(10), t0());
            controller.advance();
            controller.advance();
            assert_eq!(controller.phase_index(), Some(2));

            let entry = controller.start(guided(20), at(30));
            assert_eq!(entry.index, 0);
            assert_eq!(controller.state(), ControllerState::Running(0));
            assert_eq!(controller.config().unwrap().minutes, 20);
            assert_eq!(controller.clock().unwrap().started_at, at(30));
        }

        it "restarts a finished session" {
            controller.start(guided(5), t0());
            assert_eq!(controller.tick(at(301)), TickOutcome::Finished { total: 300 });

            controller.start(guided(5), at(400));
            assert_eq!(controller.state(), ControllerState::Running(0));
            assert!(controller.can_advance());
        }
    }

    describe "advance" {
        it "steps through every phase" {
            controller.start(guided(10), t0());
            for expected in 1..=LAST_PHASE {
                match controller.advance() {
                    AdvanceOutcome::Advanced(entry) => {
                        assert_eq!(entry.index, expected);
                        assert_eq!(entry.phase.title, PHASES[expected].title);
                    }
                    other => panic!("expected advance, got {other:?}"),
                }
            }
        }

        it "reports no further phases on the last phase and changes nothing" {
            controller.start(guided(10), t0());
            for _ in 0..LAST_PHASE {
                controller.advance();
            }
            assert!(!controller.can_advance());
            assert_eq!(controller.advance(), AdvanceOutcome::NoFurtherPhases);
            assert_eq!(controller.state(), ControllerState::Running(LAST_PHASE));
        }

        it "is a quiet no-op before start" {
            assert_eq!(controller.advance(), AdvanceOutcome::NotRunning);
            assert_eq!(controller.state(), ControllerState::Idle);
        }

        it "moves thresholds along with manual progress" {
            controller.start(guided(10), t0());
            controller.advance();
            assert_eq!(controller.tick(at(200)), TickOutcome::Waiting { elapsed: 200 });
            assert!(matches!(controller.tick(at(300)), TickOutcome::Advanced { entry, .. } if entry.index == 2));
        }
    }

    describe "finish" {
        it "happens exactly once however often tick is called" {
            controller.start(guided(10), t0());
            assert_eq!(controller.tick(at(600)), TickOutcome::Finished { total: 600 });
            for later in [601, 700, 10_000] {
                assert_eq!(controller.tick(at(later)), TickOutcome::AlreadyFinished);
            }
            assert_eq!(controller.state(), ControllerState::Finished);
        }

        it "keeps the last config for the certificate" {
            controller.start(guided(10), t0());
            controller.tick(at(600));
            assert_eq!(controller.config().unwrap().persona.key, "sage_arjun");
            assert!(controller.phase_index().is_none());
        }
    }
}
