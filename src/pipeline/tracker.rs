use crate::models::{EndpointAssessment, EndpointDetail, EndpointStatus, EndpointSummary};

/// Lifecycle of one endpoint's assessment across polls.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointTracker {
    endpoint: EndpointAssessment,
    detail_requested: bool,
}

impl EndpointTracker {
    pub fn new(ip_address: &str) -> Self {
        Self {
            endpoint: EndpointAssessment::new(ip_address),
            detail_requested: false,
        }
    }

    pub fn ip_address(&self) -> &str {
        &self.endpoint.ip_address
    }

    pub fn assessment(&self) -> &EndpointAssessment {
        &self.endpoint
    }

    /// Replace the polled state with a newer summary.
    ///
    /// A terminal status never regresses, and a summary that would regress it
    /// is dropped whole. Fields the summary omits keep their previous values.
    pub fn update(&mut self, summary: &EndpointSummary) {
        let status = EndpointStatus::from_message(summary.status_message.as_deref(), summary.progress);
        if self.is_terminal() && !status.is_terminal() {
            return;
        }
        self.endpoint.status = status;
        if summary.status_message.is_some() {
            self.endpoint.status_message = summary.status_message.clone();
        }
        if summary.progress.is_some() {
            self.endpoint.progress = summary.progress;
        }
        if summary.grade.is_some() {
            self.endpoint.grade = summary.grade;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.endpoint.is_terminal()
    }

    pub fn needs_detail(&self) -> bool {
        self.is_terminal() && !self.detail_requested && self.endpoint.detail.is_none()
    }

    /// Record that the detail fetch was issued; `needs_detail` stays false from here on.
    pub fn mark_detail_requested(&mut self) {
        self.detail_requested = true;
    }

    pub fn attach_detail(&mut self, detail: EndpointDetail) {
        if self.endpoint.grade.is_none() {
            self.endpoint.grade = detail.grade;
        }
        self.endpoint.detail = Some(detail);
    }

    /// The host finished: settle an endpoint the summaries left open.
    /// A grade or a `Ready` message means success; anything else is an error.
    pub fn finalize(&mut self) {
        if self.is_terminal() {
            return;
        }
        let ready = self.endpoint.grade.is_some()
            || EndpointStatus::from_message(self.endpoint.status_message.as_deref(), Some(100))
                == EndpointStatus::Ready;
        self.endpoint.status = if ready { EndpointStatus::Ready } else { EndpointStatus::Error };
        self.endpoint.progress = Some(100);
    }
}

/// All trackers of one host, deduplicated by IP in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSet {
    trackers: Vec<EndpointTracker>,
}

impl TrackerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of summaries and return how many endpoints were new.
    /// Summaries without an IP address are skipped.
    pub fn apply(&mut self, summaries: &[EndpointSummary]) -> usize {
        let mut added = 0;
        for summary in summaries {
            let ip = summary.ip_address.trim();
            if ip.is_empty() {
                continue;
            }
            match self.trackers.iter_mut().find(|t| t.ip_address() == ip) {
                Some(tracker) => tracker.update(summary),
                None => {
                    let mut tracker = EndpointTracker::new(ip);
                    tracker.update(summary);
                    self.trackers.push(tracker);
                    added += 1;
                }
            }
        }
        added
    }

    pub fn get(&self, ip_address: &str) -> Option<&EndpointTracker> {
        self.trackers.iter().find(|t| t.ip_address() == ip_address)
    }

    pub fn get_mut(&mut self, ip_address: &str) -> Option<&mut EndpointTracker> {
        self.trackers.iter_mut().find(|t| t.ip_address() == ip_address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointTracker> {
        self.trackers.iter()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn all_terminal(&self) -> bool {
        self.trackers.iter().all(EndpointTracker::is_terminal)
    }

    pub fn finalize_all(&mut self) {
        for tracker in &mut self.trackers {
            tracker.finalize();
        }
    }

    /// IPs whose detail should be fetched now, marking each as requested.
    pub fn take_pending_details(&mut self) -> Vec<String> {
        self.trackers
            .iter_mut()
            .filter(|t| t.needs_detail())
            .map(|t| {
                t.mark_detail_requested();
                t.ip_address().to_string()
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<EndpointAssessment> {
        self.trackers.iter().map(|t| t.assessment().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Grade;

    fn summary(ip: &str, message: &str, grade: Option<Grade>) -> EndpointSummary {
        EndpointSummary {
            grade,
            ..EndpointSummary::new(ip, message)
        }
    }

    #[test]
    fn test_update_tracks_progress() {
        let mut t = EndpointTracker::new("1.2.3.4");
        assert!(!t.is_terminal());
        assert!(!t.needs_detail());

        t.update(&EndpointSummary { progress: Some(30), ..EndpointSummary::new("1.2.3.4", "In progress") });
        assert_eq!(t.assessment().status, EndpointStatus::InProgress);
        assert_eq!(t.assessment().progress, Some(30));
        assert!(!t.needs_detail());

        t.update(&summary("1.2.3.4", "Ready", Some(Grade::APlus)));
        assert!(t.is_terminal());
        assert!(t.needs_detail());
        assert_eq!(t.assessment().grade, Some(Grade::APlus));
    }

    #[test]
    fn test_needs_detail_only_once() {
        let mut t = EndpointTracker::new("1.2.3.4");
        t.update(&summary("1.2.3.4", "Ready", Some(Grade::A)));
        assert!(t.needs_detail());
        t.mark_detail_requested();
        assert!(!t.needs_detail());

        // More terminal summaries after the request change nothing
        t.update(&summary("1.2.3.4", "Ready", Some(Grade::A)));
        t.update(&summary("1.2.3.4", "Ready", None));
        assert!(!t.needs_detail());
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut t = EndpointTracker::new("1.2.3.4");
        t.update(&summary("1.2.3.4", "Ready", Some(Grade::B)));
        t.update(&EndpointSummary::new("1.2.3.4", "In progress"));
        assert_eq!(t.assessment().status, EndpointStatus::Ready);
        assert_eq!(t.assessment().grade, Some(Grade::B));
    }

    #[test]
    fn test_late_in_progress_summary_keeps_ready_fields() {
        let mut t = EndpointTracker::new("1.2.3.4");
        t.update(&EndpointSummary { progress: Some(100), ..summary("1.2.3.4", "Ready", Some(Grade::A)) });
        t.update(&EndpointSummary { progress: Some(40), ..EndpointSummary::new("1.2.3.4", "In progress") });

        let endpoint = t.assessment();
        assert_eq!(endpoint.status, EndpointStatus::Ready);
        assert_eq!(endpoint.status_message.as_deref(), Some("Ready"));
        assert_eq!(endpoint.progress, Some(100));
    }

    #[test]
    fn test_finalize_settles_open_endpoints() {
        let mut graded = EndpointTracker::new("1.1.1.1");
        graded.update(&summary("1.1.1.1", "In progress", Some(Grade::A)));
        graded.finalize();
        assert_eq!(graded.assessment().status, EndpointStatus::Ready);

        let mut failed = EndpointTracker::new("2.2.2.2");
        failed.update(&EndpointSummary::new("2.2.2.2", "Unable to connect to the server"));
        assert!(!failed.is_terminal());
        failed.finalize();
        assert_eq!(failed.assessment().status, EndpointStatus::Error);
        assert_eq!(
            failed.assessment().status_message.as_deref(),
            Some("Unable to connect to the server")
        );
    }

    #[test]
    fn test_attach_detail_fills_missing_grade() {
        let mut t = EndpointTracker::new("1.2.3.4");
        t.update(&EndpointSummary::new("1.2.3.4", "Ready"));
        t.attach_detail(EndpointDetail { grade: Some(Grade::AMinus), ..Default::default() });
        assert_eq!(t.assessment().grade, Some(Grade::AMinus));
        assert!(!t.needs_detail());
    }

    #[test]
    fn test_set_dedups_and_preserves_order() {
        let mut set = TrackerSet::new();
        let added = set.apply(&[
            EndpointSummary::new("5.5.5.5", "Pending"),
            EndpointSummary::new("1.1.1.1", "Pending"),
        ]);
        assert_eq!(added, 2);

        let added = set.apply(&[
            EndpointSummary::new("1.1.1.1", "In progress"),
            EndpointSummary::new("9.9.9.9", "Pending"),
            EndpointSummary::new("5.5.5.5", "Ready"),
        ]);
        assert_eq!(added, 1);

        let ips: Vec<_> = set.iter().map(|t| t.ip_address().to_string()).collect();
        assert_eq!(ips, vec!["5.5.5.5", "1.1.1.1", "9.9.9.9"]);
        assert_eq!(set.get("1.1.1.1").unwrap().assessment().status, EndpointStatus::InProgress);
        assert!(set.get("5.5.5.5").unwrap().is_terminal());
    }

    #[test]
    fn test_set_skips_summaries_without_ip() {
        let mut set = TrackerSet::new();
        assert_eq!(set.apply(&[EndpointSummary::default()]), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_take_pending_details_marks_requested() {
        let mut set = TrackerSet::new();
        set.apply(&[
            summary("1.1.1.1", "Ready", Some(Grade::A)),
            EndpointSummary::new("2.2.2.2", "In progress"),
        ]);
        assert_eq!(set.take_pending_details(), vec!["1.1.1.1".to_string()]);
        assert!(set.take_pending_details().is_empty());

        set.finalize_all();
        assert!(set.all_terminal());
        assert_eq!(set.take_pending_details(), vec!["2.2.2.2".to_string()]);
        assert!(set.take_pending_details().is_empty());
    }
}
