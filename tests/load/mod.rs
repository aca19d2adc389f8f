mod concurrent_recording;
