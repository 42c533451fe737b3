//! Message names, option keys and option values understood by the server.

pub mod request {
    pub const GET_PLAYBACK_OVERVIEW: &str = "get_playback_overview";
    pub const GET_CURRENT_TIME: &str = "get_current_time";

    pub const QUERY_TRACKS: &str = "query_tracks";
    pub const QUERY_TRACKS_BY_CATEGORY: &str = "query_tracks_by_category";
    pub const QUERY_PLAY_QUEUE_TRACKS: &str = "query_play_queue_tracks";
    pub const QUERY_TRACKS_BY_EXTERNAL_IDS: &str = "query_tracks_by_external_ids";

    pub const PAUSE_OR_RESUME: &str = "pause_or_resume";
    pub const NEXT: &str = "next";
    pub const PREVIOUS: &str = "previous";
    pub const PLAY_AT_INDEX: &str = "play_at_index";
    pub const PLAY_ALL_TRACKS: &str = "play_all_tracks";
    pub const PLAY_TRACKS_BY_CATEGORY: &str = "play_tracks_by_category";
    pub const SEEK_TO: &str = "seek_to";
    pub const SEEK_RELATIVE: &str = "seek_relative";
    pub const SET_VOLUME: &str = "set_volume";
    pub const TOGGLE_SHUFFLE: &str = "toggle_shuffle";
    pub const TOGGLE_MUTE: &str = "toggle_mute";
    pub const TOGGLE_REPEAT: &str = "toggle_repeat";
}

pub mod broadcast {
    pub const PLAYBACK_OVERVIEW_CHANGED: &str = "playback_overview_changed";
    pub const PLAY_QUEUE_CHANGED: &str = "play_queue_changed";
}

pub mod key {
    pub const STATE: &str = "state";
    pub const REPEAT_MODE: &str = "repeat_mode";
    pub const VOLUME: &str = "volume";
    pub const SHUFFLED: &str = "shuffled";
    pub const MUTED: &str = "muted";
    pub const PLAY_QUEUE_COUNT: &str = "track_count";
    pub const PLAY_QUEUE_POSITION: &str = "play_queue_position";
    pub const PLAYING_DURATION: &str = "playing_duration";
    pub const PLAYING_CURRENT_TIME: &str = "playing_current_time";
    pub const PLAYING_TRACK: &str = "playing_track";

    pub const ID: &str = "id";
    pub const CATEGORY: &str = "category";
    pub const FILTER: &str = "filter";
    pub const COUNT: &str = "count";
    pub const COUNT_ONLY: &str = "count_only";
    pub const OFFSET: &str = "offset";
    pub const LIMIT: &str = "limit";
    pub const DATA: &str = "data";
    pub const EXTERNAL_IDS: &str = "external_ids";
    pub const INDEX: &str = "index";
    pub const POSITION: &str = "position";
    pub const DELTA: &str = "delta";
    pub const RELATIVE: &str = "relative";
    pub const TIME: &str = "time";
}

pub mod value {
    pub const UP: &str = "up";
    pub const DOWN: &str = "down";
}
