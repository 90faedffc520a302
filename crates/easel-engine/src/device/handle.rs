use core::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Returns the raw id (for diagnostics only).
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// Vertex data buffer owned by a device.
    BufferHandle,
    "Buffer"
);
handle!(
    /// A compiled (not yet linked) shader stage.
    ShaderHandle,
    "Shader"
);
handle!(
    /// A linked vertex + fragment program.
    ProgramHandle,
    "Program"
);
handle!(
    /// A 2D RGBA texture.
    TextureHandle,
    "Texture"
);

/// Monotonic id source shared by all handle kinds of one device.
///
/// Ids are never reused, so a released handle can never alias a live one.
#[derive(Debug, Default)]
pub(crate) struct HandleAlloc {
    next: u32,
}

impl HandleAlloc {
    #[inline]
    pub(crate) fn next(&mut self) -> u32 {
        self.next = self.next.wrapping_add(1);
        self.next
    }
}
