use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{Align, Box as GtkBox, Button, Label, Orientation, Spinner};

use crate::ui::StyleTokens;
use crate::view::{ViewAction, ViewNode};

pub(super) type ActionSink = Rc<dyn Fn(ViewAction)>;

fn add_classes<W: IsA<gtk4::Widget>>(widget: &W, class: &str) {
    for name in class.split_whitespace() {
        widget.add_css_class(name);
    }
}

fn build_box(
    orientation: Orientation,
    class: &str,
    children: &[ViewNode],
    tokens: StyleTokens,
    actions: &ActionSink,
) -> gtk4::Widget {
    let spacing = match orientation {
        Orientation::Vertical => tokens.spacing_8,
        _ => tokens.spacing_12,
    };
    let container = GtkBox::new(orientation, spacing);
    add_classes(&container, class);
    for child in children {
        container.append(&build_widget(child, tokens, actions));
    }
    container.upcast()
}

/// Turns a rendered view tree into GTK widgets; button actions go to `actions`.
pub(super) fn build_widget(node: &ViewNode, tokens: StyleTokens, actions: &ActionSink) -> gtk4::Widget {
    match node {
        ViewNode::Column { class, children } => {
            build_box(Orientation::Vertical, class, children, tokens, actions)
        }
        ViewNode::Row { class, children } => {
            build_box(Orientation::Horizontal, class, children, tokens, actions)
        }
        ViewNode::Text { class, text } => {
            let label = Label::new(Some(text));
            label.set_wrap(true);
            label.set_xalign(0.0);
            label.set_hexpand(true);
            add_classes(&label, class);
            label.upcast()
        }
        ViewNode::Button {
            class,
            label,
            action,
        } => {
            let button = Button::with_label(label);
            button.set_halign(Align::End);
            add_classes(&button, class);
            let action = *action;
            let actions = actions.clone();
            // The handler may rebuild the tree that owns this button.
            button.connect_clicked(move |_| {
                let actions = actions.clone();
                gtk4::glib::idle_add_local_once(move || actions(action));
            });
            button.upcast()
        }
        ViewNode::Spinner => {
            let spinner = Spinner::new();
            spinner.start();
            spinner.upcast()
        }
    }
}
