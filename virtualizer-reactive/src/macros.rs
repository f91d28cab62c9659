// `tracing` events under the `virtualizer_reactive` target; compiled out without the feature.
#[cfg(feature = "tracing")]
macro_rules! vlog {
    ($level:ident, $($tt:tt)*) => {
        tracing::$level!(target: "virtualizer_reactive", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! vlog {
    ($level:ident, $($tt:tt)*) => {};
}

macro_rules! vtrace {
    ($($tt:tt)*) => {
        vlog!(trace, $($tt)*)
    };
}

macro_rules! vdebug {
    ($($tt:tt)*) => {
        vlog!(debug, $($tt)*)
    };
}

macro_rules! vwarn {
    ($($tt:tt)*) => {
        vlog!(warn, $($tt)*)
    };
}
