/// What we last heard about the opponent. Only inbound signal handlers write
/// to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteState {
    pub connected: bool,
    pub ready: bool,
    pub loser: bool,
    pub hp: i32,
    pub tile_x: i32,
    pub tile_y: i32,
    pub form: i32,
    pub navi: u32,
    /// The opponent is holding their buster.
    pub charge: bool,
    pub last_card_used: Option<String>,
    pub opened_card_select: bool,
}

impl Default for RemoteState {
    fn default() -> Self {
        Self {
            connected: false,
            ready: false,
            loser: false,
            hp: 1,
            tile_x: 5,
            tile_y: 2,
            form: 0,
            navi: 0,
            charge: false,
            last_card_used: None,
            opened_card_select: false,
        }
    }
}
