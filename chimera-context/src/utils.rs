//! Utility functions for the container

/// Dependency resolution utilities
pub mod dependency {
    use parking_lot::Mutex;

    /// Tracks beans currently being created to detect circular dependencies.
    ///
    /// Creation order is kept so that the error message can show the chain.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: Mutex<Vec<String>>,
    }

    impl CreationTracker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_creating(&self, name: &str) -> bool {
            self.creating.lock().iter().any(|n| n == name)
        }

        /// Marks a bean as being created.
        ///
        /// Returns `false` if the bean was already in creation.
        pub fn start_creating(&self, name: &str) -> bool {
            let mut creating = self.creating.lock();
            if creating.iter().any(|n| n == name) {
                return false;
            }
            creating.push(name.to_string());
            true
        }

        pub fn finish_creating(&self, name: &str) {
            let mut creating = self.creating.lock();
            if let Some(pos) = creating.iter().rposition(|n| n == name) {
                creating.remove(pos);
            }
        }

        /// Beans currently being created, outermost first.
        pub fn current_creating(&self) -> Vec<String> {
            self.creating.lock().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    mod dependency_tests {
        use super::super::dependency::*;

        #[test]
        fn test_creation_tracker() {
            let tracker = CreationTracker::new();
            assert!(!tracker.is_creating("serviceA"));

            assert!(tracker.start_creating("serviceA"));
            assert!(tracker.is_creating("serviceA"));

            // 再次进入说明出现了循环依赖
            assert!(!tracker.start_creating("serviceA"));

            tracker.finish_creating("serviceA");
            assert!(!tracker.is_creating("serviceA"));
        }

        #[test]
        fn test_current_creating_keeps_order() {
            let tracker = CreationTracker::new();
            tracker.start_creating("serviceA");
            tracker.start_creating("serviceB");
            assert_eq!(tracker.current_creating(), ["serviceA", "serviceB"]);
        }
    }
}
