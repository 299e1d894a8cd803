mod record_saved_event;
