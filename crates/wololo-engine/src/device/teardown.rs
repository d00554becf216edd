/// Reverse-order destructor stack.
///
/// Every GPU object is registered here right after it is successfully created.
/// Running the stack destroys objects in exact reverse creation order, each
/// exactly once. Dropping a non-empty stack runs it, so an early `?` return
/// during construction releases precisely the objects created so far.
#[derive(Default)]
pub struct Teardown {
    entries: Vec<(&'static str, Box<dyn FnOnce()>)>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the destructor for an object that now exists.
    pub fn push(&mut self, label: &'static str, destroy: impl FnOnce() + 'static) {
        self.entries.push((label, Box::new(destroy)));
    }

    /// Number of live objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destroys everything registered, newest first.
    pub fn run(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        log::debug!("tearing down {} objects", self.entries.len());

        while let Some((label, destroy)) = self.entries.pop() {
            log::trace!("destroy {label}");
            destroy();
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(label, _)| label)).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| -> Box<dyn FnOnce()> {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn runs_in_reverse_creation_order() {
        let (log, make) = recorder();
        let mut td = Teardown::new();
        for name in ["instance", "device", "swapchain", "pipeline"] {
            td.push(name, make(name));
        }
        td.run();
        assert_eq!(*log.borrow(), vec!["pipeline", "swapchain", "device", "instance"]);
        assert!(td.is_empty());
    }

    #[test]
    fn each_destructor_runs_once() {
        let (log, make) = recorder();
        let mut td = Teardown::new();
        td.push("a", make("a"));
        td.push("b", make("b"));
        td.run();
        td.run();
        drop(td);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn drop_releases_partial_construction() {
        let (log, make) = recorder();

        let build = |fail_after_surface: bool| -> Result<Teardown, &'static str> {
            let mut td = Teardown::new();
            td.push("instance", make("instance"));
            td.push("surface", make("surface"));
            if fail_after_surface {
                return Err("no graphics queue");
            }
            td.push("device", make("device"));
            Ok(td)
        };

        assert!(build(true).is_err());
        assert_eq!(*log.borrow(), vec!["surface", "instance"]);
    }

    #[test]
    fn empty_stack_is_noop() {
        let mut td = Teardown::new();
        td.run();
        assert_eq!(td.len(), 0);
    }
}
