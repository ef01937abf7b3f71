//! Capture-level aggregation of check verdicts
//!
//! Every conversation is checked against every candidate test case; per-conversation
//! verdicts are folded into one verdict per (client host, server host, test case) bucket.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::Result;
use crate::check::{CheckReport, Protocol, TestCaseRegistry, Verdict, run_check};
use crate::config::AnalysisConfig;
use crate::flow::{ConversationId, TrackedCapture, track};
use crate::types::{Frame, FrameId, HostPair};

/// Verdict of one test case between one client and one server host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub hosts: HostPair,
    pub test_case: String,
    /// Most severe verdict among the occurrences
    pub verdict: Verdict,
    /// Applicable runs, in conversation order
    pub occurrences: Vec<CheckReport>,
}

impl Bucket {
    fn new(hosts: HostPair, test_case: &str) -> Self {
        Self { hosts, test_case: test_case.to_string(), verdict: Verdict::None, occurrences: Vec::new() }
    }

    fn add(&mut self, report: CheckReport) {
        self.verdict = self.verdict.max(report.verdict);
        self.occurrences.push(report);
    }
}

/// Overall result of one test case over the whole capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseSummary {
    pub test_case: String,
    pub verdict: Verdict,
    /// Conversations the test case applied to
    pub conversations: Vec<ConversationId>,
    /// Every capture frame outside those conversations
    pub ignored: Vec<FrameId>,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub capture: TrackedCapture,
    /// Buckets in order of their first occurrence
    pub buckets: Vec<Bucket>,
}

impl AnalysisReport {
    /// Most severe bucket verdict.
    pub fn verdict(&self) -> Verdict {
        self.buckets.iter().map(|bucket| bucket.verdict).max().unwrap_or_default()
    }

    pub fn buckets_for<'a>(&'a self, test_case: &'a str) -> impl Iterator<Item = &'a Bucket> + 'a {
        self.buckets.iter().filter(move |bucket| bucket.test_case == test_case)
    }

    pub fn test_case_summary(&self, test_case: &str) -> TestCaseSummary {
        let mut verdict = Verdict::None;
        let mut conversations = BTreeSet::new();
        for bucket in self.buckets_for(test_case) {
            verdict = verdict.max(bucket.verdict);
            conversations.extend(bucket.occurrences.iter().map(|report| report.conversation));
        }

        let ignored = self
            .capture
            .conversations
            .iter()
            .filter(|conversation| !conversations.contains(&conversation.id))
            .flat_map(|conversation| conversation.frame_ids())
            .chain(self.capture.ignored.iter().map(|frame| frame.id))
            .collect::<BTreeSet<_>>();

        TestCaseSummary {
            test_case: test_case.to_string(),
            verdict,
            conversations: conversations.into_iter().collect(),
            ignored: ignored.into_iter().collect(),
        }
    }
}

/// Tracks a capture and runs the registry's test cases over it.
#[derive(Debug)]
pub struct Analysis<'r> {
    registry: &'r TestCaseRegistry,
    config: AnalysisConfig,
}

impl<'r> Analysis<'r> {
    pub fn new(registry: &'r TestCaseRegistry, config: AnalysisConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyse<I>(&self, frames: I) -> Result<AnalysisReport>
    where
        I: IntoIterator<Item = Frame>,
    {
        self.config.validate()?;
        let capture = track(frames, &self.config);

        let candidates = self.registry.select(Protocol::Coap, &self.config);
        let forced = candidates.len() == 1;
        debug!(candidates = candidates.len(), forced, "Running test cases");

        let mut buckets: Vec<Bucket> = Vec::new();
        let mut index: HashMap<(HostPair, String), usize> = HashMap::new();

        for conversation in &capture.conversations {
            for test_case in &candidates {
                let report = run_check(&capture.conversations, conversation.id, *test_case, forced)?;
                if !report.applicable {
                    continue;
                }

                let key = (conversation.hosts(), test_case.id().to_string());
                let slot = *index.entry(key).or_insert_with(|| {
                    buckets.push(Bucket::new(conversation.hosts(), test_case.id()));
                    buckets.len() - 1
                });
                buckets[slot].add(report);
            }
        }

        let report = AnalysisReport { capture, buckets };
        info!(
            conversations = report.capture.conversations.len(),
            ignored = report.capture.ignored.len(),
            buckets = report.buckets.len(),
            verdict = %report.verdict(),
            "Analysis complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckResult, Checker, MessageTemplate, Sender, TestCase};
    use crate::codec::{Code, CoapMessage, MessageType};
    use crate::test_utils::{CLIENT, SERVER, at, frame_from, frame_to, get_request, piggybacked};

    /// Passes on GET requests answered with 2.05, fails on any other answer.
    struct GetContent;

    impl TestCase for GetContent {
        fn id(&self) -> &str {
            "GET"
        }

        fn objective(&self) -> &str {
            "GET answered with Content"
        }

        fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
            checker.match_frame(Sender::Client, &MessageTemplate::new().code(Code::GET), Some(Verdict::Inconclusive))?;
            checker.advance()?;
            checker.match_frame(Sender::Server, &MessageTemplate::new().code(Code::CONTENT), Some(Verdict::Fail))?;
            Ok(())
        }
    }

    struct Delete;

    impl TestCase for Delete {
        fn id(&self) -> &str {
            "DELETE"
        }

        fn objective(&self) -> &str {
            "DELETE answered with Deleted"
        }

        fn run(&self, checker: &mut Checker<'_>) -> CheckResult {
            checker.match_frame(Sender::Client, &MessageTemplate::new().code(Code::DELETE), Some(Verdict::Inconclusive))?;
            checker.advance()?;
            checker.match_frame(Sender::Server, &MessageTemplate::new().code(Code::DELETED), Some(Verdict::Fail))?;
            Ok(())
        }
    }

    fn registry() -> TestCaseRegistry {
        let mut registry = TestCaseRegistry::new();
        registry.register(GetContent).unwrap();
        registry.register(Delete).unwrap();
        registry
    }

    #[test]
    fn bucket_takes_most_severe_occurrence() -> anyhow::Result<()> {
        let not_found = CoapMessage::new(MessageType::Acknowledgement, Code::NOT_FOUND, 2).with_token([2]);
        let frames = vec![
            frame_to(1, 0.0, get_request(1, 1, "a")),
            frame_from(2, 0.1, piggybacked(1, 1)),
            frame_to(3, 1.0, get_request(2, 2, "b")),
            frame_from(4, 1.1, not_found),
        ];
        let registry = registry();
        let report = Analysis::new(&registry, AnalysisConfig::default()).analyse(frames)?;

        assert_eq!(report.buckets.len(), 1, "DELETE never applies");
        let bucket = &report.buckets[0];
        assert_eq!(bucket.hosts, HostPair::new(CLIENT.ip(), SERVER.ip()));
        assert_eq!(bucket.occurrences.len(), 2);
        assert_eq!(bucket.verdict, Verdict::Fail);
        assert_eq!(report.verdict(), Verdict::Fail);

        let summary = report.test_case_summary("DELETE");
        assert_eq!(summary.verdict, Verdict::None);
        assert!(summary.conversations.is_empty());
        assert_eq!(summary.ignored.len(), 4);
        Ok(())
    }

    #[test]
    fn buckets_split_by_host_pair() -> anyhow::Result<()> {
        let other = at("10.0.0.7:40000");
        let frames = vec![
            frame_to(1, 0.0, get_request(1, 1, "a")),
            frame_from(2, 0.1, piggybacked(1, 1)),
            Frame::new(3, 0.2, other, SERVER, get_request(1, 1, "a")),
            Frame::new(4, 0.3, SERVER, other, piggybacked(1, 1)),
        ];
        let registry = registry();
        let report = Analysis::new(&registry, AnalysisConfig::default()).analyse(frames)?;
        assert_eq!(report.buckets_for("GET").count(), 2);
        assert!(report.buckets.iter().all(|bucket| bucket.verdict == Verdict::Pass));

        let summary = report.test_case_summary("GET");
        assert_eq!(summary.conversations, vec![ConversationId(0), ConversationId(1)]);
        assert!(summary.ignored.is_empty());
        Ok(())
    }

    #[test]
    fn selection_makes_single_candidate_forced() -> anyhow::Result<()> {
        let frames = vec![
            frame_to(1, 0.0, get_request(1, 1, "a")),
            frame_from(2, 0.1, piggybacked(1, 1)),
        ];
        let registry = registry();
        let config = AnalysisConfig { test_cases: vec!["DELETE".into()], ..Default::default() };
        let report = Analysis::new(&registry, config).analyse(frames)?;

        // forced: the inconclusive request mismatch is recorded instead of skipped
        let bucket = &report.buckets[0];
        assert_eq!(bucket.test_case, "DELETE");
        assert_eq!(bucket.verdict, Verdict::Fail);
        assert_eq!(bucket.occurrences[0].implicated, vec![FrameId(1), FrameId(2)]);
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected() {
        let registry = registry();
        let mut config = AnalysisConfig::default();
        config.transmission.ack_timeout = -1.0;
        assert!(Analysis::new(&registry, config).analyse(Vec::new()).is_err());
    }
}
