use crate::territory::Owner;

/// Display color for an owner, matching the CSS named colors players pick from.
pub const fn owner_rgb(owner: Owner) -> (u8, u8, u8) {
    match owner {
        Owner::Green => (0, 128, 0),
        Owner::Red => (255, 0, 0),
        Owner::Blue => (0, 0, 255),
        Owner::Yellow => (255, 255, 0),
    }
}

/// `#rrggbb` form of [`owner_rgb`].
pub fn owner_hex(owner: Owner) -> String {
    let (r, g, b) = owner_rgb(owner);
    format!("#{r:02x}{g:02x}{b:02x}")
}
