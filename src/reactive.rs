//! Reactive redraw - bind an element's redraws to signals.
//!
//! ```ignore
//! let count = signal(0);
//! let c = count.clone();
//! redraw_on(counter, move || c.get())?;
//! count.set(1); // counter redraws
//! ```

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::effect;

use crate::element::Element;
use crate::error::{Result, UiError};

/// Redraw `element` whenever the signals read by `source` change.
///
/// The first run only subscribes. Signals read by `render()` during a
/// triggered redraw are tracked too, so they also trigger later redraws.
/// The binding is dropped when the element is destroyed.
pub fn redraw_on<T: 'static>(element: Element, source: impl Fn() -> T + 'static) -> Result<()> {
    if !element.is_alive() {
        return Err(UiError::DeadElement(element));
    }
    let first_run = Rc::new(Cell::new(true));
    let stop = effect(move || {
        let _ = source();
        if first_run.replace(false) {
            return;
        }
        if element.is_alive() && !element.redraw() {
            tracing::debug!(?element, "signal changed before mount");
        }
    });
    element.add_cleanup_job(stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{mount_root, tag, Component, Options, Children, ElementDesc, Child};
    use crate::{dom, reset_runtime};
    use spark_signals::{signal, Signal};
    use std::any::Any;

    struct Counter {
        count: Signal<i32>,
    }

    impl Component for Counter {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn render(&self, _element: Element, _options: &Options) -> Children {
            Rc::new(vec![Child::Text(format!("count {}", self.count.get()))])
        }
    }

    #[test]
    fn test_redraws_on_signal_change() {
        reset_runtime();
        let count = signal(0);
        let root = mount_root(
            ElementDesc::new(Counter {
                count: count.clone(),
            }),
            dom::body(),
        )
        .unwrap();
        let source = count.clone();
        redraw_on(root, move || source.get()).unwrap();
        let node = root.node().unwrap();
        assert_eq!(dom::text_content(node), "count 0");

        count.set(3);
        assert_eq!(dom::text_content(node), "count 3");
    }

    #[test]
    fn test_binding_stops_on_destroy() {
        reset_runtime();
        let count = signal(0);
        let root = mount_root(tag("div"), dom::body()).unwrap();
        let source = count.clone();
        redraw_on(root, move || source.get()).unwrap();

        root.destroy_node();
        // No redraw attempted on a destroyed element.
        count.set(1);
        assert!(!root.is_alive());
        assert!(redraw_on(root, || ()).is_err());
    }
}
