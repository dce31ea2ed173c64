use crate::{attr, field};

/// Map a named-field level onto the attribute model.
///
/// The four canonical levels map exactly. Anything below DEBUG clamps to
/// DEBUG; anything above ERROR (DPANIC, PANIC, FATAL and beyond) clamps to
/// ERROR.
pub fn to_attr_level(level: field::Level) -> attr::Level {
    match level {
        field::Level::DEBUG => attr::Level::DEBUG,
        field::Level::INFO => attr::Level::INFO,
        field::Level::WARN => attr::Level::WARN,
        field::Level::ERROR => attr::Level::ERROR,
        l if l < field::Level::DEBUG => attr::Level::DEBUG,
        _ => attr::Level::ERROR,
    }
}

/// Map an attribute level onto the named-field model.
///
/// Step function with inclusive upper bounds: `<= DEBUG` is DEBUG,
/// `<= INFO` is INFO, `<= WARN` is WARN, everything else is ERROR. A level
/// between two canonical points therefore maps to the more severe one.
pub fn to_field_level(level: attr::Level) -> field::Level {
    if level <= attr::Level::DEBUG {
        field::Level::DEBUG
    } else if level <= attr::Level::INFO {
        field::Level::INFO
    } else if level <= attr::Level::WARN {
        field::Level::WARN
    } else {
        field::Level::ERROR
    }
}
