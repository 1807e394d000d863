pub mod threaded_detection_worker;
